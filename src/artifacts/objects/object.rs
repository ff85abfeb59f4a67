use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tag::Tag;
use crate::artifacts::objects::tree::Tree;
use crate::errors::{Error, Result};
use bytes::Bytes;

/// Canonical serialization of an object payload (without the header)
pub trait Packable {
    fn serialize_payload(&self) -> Bytes;
}

pub trait Unpackable {
    /// Parse an object from its payload; the `<type> <size>\0` header has
    /// already been consumed by the store
    fn deserialize(payload: Bytes) -> Result<Self>
    where
        Self: Sized;
}

pub trait Object: Packable {
    fn object_type(&self) -> ObjectType;

    fn display(&self) -> String;

    /// Full serialized form `<type> <size>\0<payload>`
    fn serialize(&self) -> Bytes {
        let payload = self.serialize_payload();
        let mut serialized =
            format!("{} {}\0", self.object_type().as_str(), payload.len()).into_bytes();
        serialized.extend_from_slice(&payload);
        serialized.into()
    }

    /// Content address of the object
    fn object_id(&self) -> ObjectId {
        ObjectId::hash_serialized(&self.serialize())
    }
}

/// Raw object as read from the store: a type tag plus the inflated payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawObject {
    pub object_type: ObjectType,
    pub data: Bytes,
}

/// A parsed object of any kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectBox {
    Blob(Blob),
    Tree(Tree),
    Commit(Box<Commit>),
    Tag(Box<Tag>),
}

impl ObjectBox {
    pub fn parse(raw: RawObject) -> Result<Self> {
        Ok(match raw.object_type {
            ObjectType::Blob => ObjectBox::Blob(Blob::deserialize(raw.data)?),
            ObjectType::Tree => ObjectBox::Tree(Tree::deserialize(raw.data)?),
            ObjectType::Commit => ObjectBox::Commit(Box::new(Commit::deserialize(raw.data)?)),
            ObjectType::Tag => ObjectBox::Tag(Box::new(Tag::deserialize(raw.data)?)),
        })
    }

    pub fn object_type(&self) -> ObjectType {
        match self {
            ObjectBox::Blob(_) => ObjectType::Blob,
            ObjectBox::Tree(_) => ObjectType::Tree,
            ObjectBox::Commit(_) => ObjectType::Commit,
            ObjectBox::Tag(_) => ObjectType::Tag,
        }
    }

    pub fn display(&self) -> String {
        match self {
            ObjectBox::Blob(blob) => blob.display(),
            ObjectBox::Tree(tree) => tree.display(),
            ObjectBox::Commit(commit) => commit.display(),
            ObjectBox::Tag(tag) => tag.display(),
        }
    }

    pub fn object_id(&self) -> ObjectId {
        match self {
            ObjectBox::Blob(blob) => blob.object_id(),
            ObjectBox::Tree(tree) => tree.object_id(),
            ObjectBox::Commit(commit) => commit.object_id(),
            ObjectBox::Tag(tag) => tag.object_id(),
        }
    }

    pub fn into_commit(self, oid: &ObjectId) -> Result<Commit> {
        match self {
            ObjectBox::Commit(commit) => Ok(*commit),
            other => Err(Error::corrupt(
                oid,
                format!("expected commit, found {}", other.object_type()),
            )),
        }
    }

    pub fn into_tree(self, oid: &ObjectId) -> Result<Tree> {
        match self {
            ObjectBox::Tree(tree) => Ok(tree),
            other => Err(Error::corrupt(
                oid,
                format!("expected tree, found {}", other.object_type()),
            )),
        }
    }

    pub fn into_blob(self, oid: &ObjectId) -> Result<Blob> {
        match self {
            ObjectBox::Blob(blob) => Ok(blob),
            other => Err(Error::corrupt(
                oid,
                format!("expected blob, found {}", other.object_type()),
            )),
        }
    }
}
