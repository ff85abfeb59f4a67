use crate::errors::{Error, Result};
use std::io::BufRead;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Blob,
    Tree,
    Commit,
    Tag,
}

impl ObjectType {
    pub fn as_str(&self) -> &str {
        match self {
            ObjectType::Blob => "blob",
            ObjectType::Tree => "tree",
            ObjectType::Commit => "commit",
            ObjectType::Tag => "tag",
        }
    }

    /// Type code used in pack entry headers (1..=4)
    pub fn from_pack_code(code: u8) -> Option<ObjectType> {
        match code {
            1 => Some(ObjectType::Commit),
            2 => Some(ObjectType::Tree),
            3 => Some(ObjectType::Blob),
            4 => Some(ObjectType::Tag),
            _ => None,
        }
    }

    /// Parse a loose object header `<type> <size>\0`, returning the type and
    /// the declared payload size
    pub fn parse_object_header(data_reader: &mut impl BufRead) -> Result<(ObjectType, u64)> {
        let mut object_type = Vec::new();
        data_reader
            .read_until(b' ', &mut object_type)
            .map_err(|e| Error::corrupt("loose object", e.to_string()))?;
        if object_type.pop() != Some(b' ') {
            return Err(Error::corrupt("loose object", "truncated header"));
        }

        let mut size = Vec::new();
        data_reader
            .read_until(b'\0', &mut size)
            .map_err(|e| Error::corrupt("loose object", e.to_string()))?;
        if size.pop() != Some(b'\0') {
            return Err(Error::corrupt("loose object", "unterminated header"));
        }

        let object_type = std::str::from_utf8(&object_type)
            .map_err(|_| Error::corrupt("loose object", "non-ascii object type"))?;
        let size = std::str::from_utf8(&size)
            .ok()
            .and_then(|size| size.parse::<u64>().ok())
            .ok_or_else(|| Error::corrupt("loose object", "invalid size in header"))?;

        Ok((ObjectType::try_from(object_type)?, size))
    }
}

impl TryFrom<&str> for ObjectType {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        match value {
            "blob" => Ok(ObjectType::Blob),
            "tree" => Ok(ObjectType::Tree),
            "commit" => Ok(ObjectType::Commit),
            "tag" => Ok(ObjectType::Tag),
            other => Err(Error::corrupt(
                "object header",
                format!("invalid object type '{other}'"),
            )),
        }
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_type_and_size_from_header() {
        let mut reader = Cursor::new(b"commit 182\0tree ...".to_vec());
        let (object_type, size) = ObjectType::parse_object_header(&mut reader).unwrap();

        assert_eq!(object_type, ObjectType::Commit);
        assert_eq!(size, 182);
    }

    #[test]
    fn rejects_unknown_type_and_truncated_header() {
        let mut unknown = Cursor::new(b"widget 3\0abc".to_vec());
        assert!(ObjectType::parse_object_header(&mut unknown).is_err());

        let mut truncated = Cursor::new(b"blob 12".to_vec());
        assert!(ObjectType::parse_object_header(&mut truncated).is_err());
    }
}
