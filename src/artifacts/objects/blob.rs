//! Git blob object
//!
//! Blobs store file content in Git. They contain only the raw file data,
//! without any metadata like filename or permissions (those live in trees).
//!
//! ## Format
//!
//! On disk: `blob <size>\0<content>`

use crate::artifacts::objects::object::{Object, Packable, Unpackable};
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::Result;
use bytes::Bytes;
use derive_new::new;

#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct Blob {
    content: Bytes,
}

impl Blob {
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn into_content(self) -> Bytes {
        self.content
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }
}

impl Packable for Blob {
    fn serialize_payload(&self) -> Bytes {
        self.content.clone()
    }
}

impl Unpackable for Blob {
    fn deserialize(payload: Bytes) -> Result<Self> {
        Ok(Self::new(payload))
    }
}

impl Object for Blob {
    fn object_type(&self) -> ObjectType {
        ObjectType::Blob
    }

    fn display(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }
}
