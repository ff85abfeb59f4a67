//! Annotated tag object
//!
//! ```text
//! object <target-sha>
//! type <target-type>
//! tag <name>
//! tagger <name> <email> <timestamp> <timezone>
//!
//! <message>
//! ```
//!
//! Like commits, tags serialize back to the payload they were read from.

use crate::artifacts::objects::commit::{split_headers, write_header, Author};
use crate::artifacts::objects::object::{Object, Packable, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::{Error, Result};
use bytes::Bytes;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    target: ObjectId,
    target_type: ObjectType,
    name: String,
    /// Very old tags were written without a tagger
    tagger: Option<Author>,
    message: String,
    raw: Bytes,
}

impl Tag {
    pub fn new(
        target: ObjectId,
        target_type: ObjectType,
        name: String,
        tagger: Option<Author>,
        message: String,
    ) -> Self {
        let mut content = String::new();
        write_header(&mut content, "object", &target.to_hex());
        write_header(&mut content, "type", target_type.as_str());
        write_header(&mut content, "tag", &name);
        if let Some(tagger) = &tagger {
            write_header(&mut content, "tagger", &tagger.display());
        }
        content.push('\n');
        content.push_str(&message);

        Tag {
            target,
            target_type,
            name,
            tagger,
            message,
            raw: content.into(),
        }
    }

    pub fn target(&self) -> &ObjectId {
        &self.target
    }

    pub fn target_type(&self) -> ObjectType {
        self.target_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tagger(&self) -> Option<&Author> {
        self.tagger.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Packable for Tag {
    fn serialize_payload(&self) -> Bytes {
        self.raw.clone()
    }
}

impl Unpackable for Tag {
    fn deserialize(payload: Bytes) -> Result<Self> {
        let (headers, message) = split_headers(&payload);

        let mut target = None;
        let mut target_type = None;
        let mut name = None;
        let mut tagger = None;

        for (key, value) in headers {
            match key.as_str() {
                "object" => {
                    target = Some(ObjectId::try_parse(&value).map_err(|_| {
                        Error::corrupt("tag", format!("invalid object line '{value}'"))
                    })?)
                }
                "type" => target_type = Some(ObjectType::try_from(value.as_str())?),
                "tag" => name = Some(value),
                "tagger" => tagger = Some(Author::try_from(value.as_str())?),
                _ => {}
            }
        }

        Ok(Tag {
            target: target.ok_or_else(|| Error::corrupt("tag", "missing object line"))?,
            target_type: target_type.ok_or_else(|| Error::corrupt("tag", "missing type line"))?,
            name: name.ok_or_else(|| Error::corrupt("tag", "missing tag line"))?,
            tagger,
            message,
            raw: payload,
        })
    }
}

impl Object for Tag {
    fn object_type(&self) -> ObjectType {
        ObjectType::Tag
    }

    fn display(&self) -> String {
        String::from_utf8_lossy(&self.serialize_payload()).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_annotated_tag() {
        let payload = "object 0123456789abcdef0123456789abcdef01234567\n\
type commit\n\
tag v1.0\n\
tagger Jane Doe <jane@example.com> 1700000000 +0000\n\
\n\
Release 1.0\n";
        let tag = Tag::deserialize(Bytes::from(payload)).unwrap();

        assert_eq!(tag.name(), "v1.0");
        assert_eq!(tag.target_type(), ObjectType::Commit);
        assert_eq!(tag.tagger().unwrap().name(), "Jane Doe");
        assert_eq!(tag.message(), "Release 1.0\n");
        assert_eq!(tag.serialize_payload(), Bytes::from(payload));
    }

    #[test]
    fn tag_without_object_is_corrupt() {
        let payload = Bytes::from_static(b"type commit\ntag v1\n\nmsg\n");
        assert!(Tag::deserialize(payload).is_err());
    }
}
