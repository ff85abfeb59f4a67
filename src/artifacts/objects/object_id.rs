//! Git object identifier (SHA-1 hash)
//!
//! Object IDs are 20-byte SHA-1 digests. They uniquely identify all objects in
//! Git (blobs, trees, commits, tags) and are used as map keys everywhere.
//!
//! ## Format
//!
//! - Binary: 20 raw bytes (tree entries, pack indexes)
//! - Full hex: 40 characters (e.g., "abc123...def")
//! - Short: first 7 hex characters
//!
//! ## Storage
//!
//! Loose objects live in `.git/objects/<first-2-chars>/<remaining-38-chars>`

use crate::artifacts::objects::{OBJECT_ID_LENGTH, OBJECT_ID_RAW_LENGTH};
use crate::errors::{Error, Result};
use sha1::{Digest, Sha1};
use std::io;
use std::path::PathBuf;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ObjectId([u8; OBJECT_ID_RAW_LENGTH]);

impl ObjectId {
    /// Parse and validate a full 40-character hexadecimal object ID
    pub fn try_parse(id: &str) -> Result<Self> {
        if id.len() != OBJECT_ID_LENGTH {
            return Err(Error::RevisionNotFound(id.to_string()));
        }

        let mut raw = [0u8; OBJECT_ID_RAW_LENGTH];
        hex::decode_to_slice(id, &mut raw).map_err(|_| Error::RevisionNotFound(id.to_string()))?;

        Ok(Self(raw))
    }

    pub fn from_raw(raw: [u8; OBJECT_ID_RAW_LENGTH]) -> Self {
        Self(raw)
    }

    pub fn try_from_slice(raw: &[u8]) -> Option<Self> {
        <[u8; OBJECT_ID_RAW_LENGTH]>::try_from(raw).ok().map(Self)
    }

    /// Hash a canonical `<type> <size>\0<payload>` serialization
    pub fn hash_serialized(serialized: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(serialized);
        Self(hasher.finalize().into())
    }

    /// Read an object ID from its 20-byte binary form
    pub fn read_h40_from<R: io::Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        let mut raw = [0u8; OBJECT_ID_RAW_LENGTH];
        reader.read_exact(&mut raw)?;
        Ok(Self(raw))
    }

    pub fn as_bytes(&self) -> &[u8; OBJECT_ID_RAW_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Convert to file system path for loose object storage
    ///
    /// Splits the hash as `XX/YYYYYY...` where XX is the first 2 chars.
    pub fn to_path(&self) -> PathBuf {
        let hex = self.to_hex();
        let (dir, file) = hex.split_at(2);
        PathBuf::from(dir).join(file)
    }

    /// First 7 characters of the hash (standard Git abbreviation)
    pub fn to_short_oid(&self) -> String {
        self.to_hex()[..7].to_string()
    }

    pub fn starts_with_hex(&self, prefix: &str) -> bool {
        self.to_hex().starts_with(&prefix.to_ascii_lowercase())
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl std::str::FromStr for ObjectId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::try_parse(s)
    }
}
