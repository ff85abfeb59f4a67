//! Git tree object
//!
//! Trees represent directory snapshots in Git. They contain entries for files
//! (blobs), symlinks, submodules (gitlinks) and subdirectories (other trees),
//! along with their names and modes.
//!
//! ## Format
//!
//! On disk: `tree <size>\0<entries>`
//! Each entry: `<mode> <name>\0<20-byte-sha1>`
//!
//! ## Ordering
//!
//! Entries are kept in git's canonical order: byte-wise by name, where a
//! directory name sorts as if it carried a trailing `/`. That interleaves
//! `foo.txt`, `foo/` and `foo0` the same way git itself writes them.
//!
//! ## Names
//!
//! Names are arbitrary bytes except `/` and NUL. They are stored as read and
//! only decoded (lossily) for display, so a tree always re-serializes to the
//! id it was read under.

use crate::artifacts::objects::entry_mode::EntryMode;
use crate::artifacts::objects::object::{Object, Packable, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::{Error, Result};
use bytes::Bytes;
use derive_new::new;
use std::borrow::Cow;
use std::cmp::Ordering;

/// A single named entry of a tree
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct TreeEntry {
    #[new(into)]
    name: Bytes,
    pub mode: EntryMode,
    pub oid: ObjectId,
    /// Blob size, filled in when the store could report it cheaply
    #[new(default)]
    pub size: Option<u64>,
}

impl TreeEntry {
    /// Name for display; bytes that are not UTF-8 become U+FFFD
    pub fn name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }

    pub fn name_bytes(&self) -> &[u8] {
        &self.name
    }

    pub fn is_tree(&self) -> bool {
        self.mode.is_tree()
    }

    pub fn object_type(&self) -> ObjectType {
        match self.mode {
            EntryMode::Directory => ObjectType::Tree,
            EntryMode::Submodule => ObjectType::Commit,
            EntryMode::File(_) | EntryMode::Symlink => ObjectType::Blob,
        }
    }

    /// Canonical ordering of two tree entries
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        canonical_name_cmp(&self.name, self.is_tree(), &other.name, other.is_tree())
    }
}

/// Compare names as git does: directories sort as if suffixed by `/`
pub fn canonical_name_cmp(a: &[u8], a_is_tree: bool, b: &[u8], b_is_tree: bool) -> Ordering {
    let a_bytes = a.iter().copied().chain(a_is_tree.then_some(b'/'));
    let b_bytes = b.iter().copied().chain(b_is_tree.then_some(b'/'));
    a_bytes.cmp(b_bytes)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    entries: Vec<TreeEntry>,
}

impl Tree {
    pub fn new(mut entries: Vec<TreeEntry>) -> Self {
        entries.sort_by(TreeEntry::canonical_cmp);
        Tree { entries }
    }

    pub fn entries(&self) -> impl Iterator<Item = &TreeEntry> {
        self.entries.iter()
    }

    pub fn into_entries(self) -> impl Iterator<Item = TreeEntry> {
        self.entries.into_iter()
    }

    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries
            .iter()
            .find(|entry| entry.name_bytes() == name.as_bytes())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Packable for Tree {
    fn serialize_payload(&self) -> Bytes {
        let mut content = Vec::new();
        for entry in &self.entries {
            let mode = entry.mode.as_str().trim_start_matches('0');
            content.extend_from_slice(mode.as_bytes());
            content.push(b' ');
            content.extend_from_slice(&entry.name);
            content.push(0);
            content.extend_from_slice(entry.oid.as_bytes());
        }

        content.into()
    }
}

impl Unpackable for Tree {
    fn deserialize(payload: Bytes) -> Result<Self> {
        let mut entries = Vec::new();
        let mut rest: &[u8] = &payload;

        while !rest.is_empty() {
            let space = rest
                .iter()
                .position(|&b| b == b' ')
                .ok_or_else(|| Error::corrupt("tree", "unexpected EOF in mode"))?;
            let mode = std::str::from_utf8(&rest[..space])
                .map_err(|_| Error::corrupt("tree", "non-ascii mode"))?;
            let mode = EntryMode::from_octal_str(mode)?;
            rest = &rest[space + 1..];

            let nul = rest
                .iter()
                .position(|&b| b == 0)
                .ok_or_else(|| Error::corrupt("tree", "unexpected EOF in name"))?;
            let name = payload.slice_ref(&rest[..nul]);
            rest = &rest[nul + 1..];

            if rest.len() < 20 {
                return Err(Error::corrupt("tree", "unexpected EOF in object id"));
            }
            let oid = ObjectId::try_from_slice(&rest[..20])
                .ok_or_else(|| Error::corrupt("tree", "truncated object id"))?;
            rest = &rest[20..];

            entries.push(TreeEntry::new(name, mode, oid));
        }

        Ok(Tree::new(entries))
    }
}

impl Object for Tree {
    fn object_type(&self) -> ObjectType {
        ObjectType::Tree
    }

    fn display(&self) -> String {
        self.entries
            .iter()
            .map(|entry| {
                format!(
                    "{} {} {}\t{}",
                    entry.mode.as_str(),
                    entry.object_type(),
                    entry.oid,
                    entry.name()
                )
            })
            .collect::<Vec<String>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::objects::entry_mode::FileMode;
    use pretty_assertions::assert_eq;

    fn file(name: &str) -> TreeEntry {
        TreeEntry::new(
            name.to_string(),
            EntryMode::File(FileMode::Regular),
            ObjectId::default(),
        )
    }

    fn dir(name: &str) -> TreeEntry {
        TreeEntry::new(name.to_string(), EntryMode::Directory, ObjectId::default())
    }

    #[test]
    fn directories_sort_as_if_suffixed_with_slash() {
        let tree = Tree::new(vec![file("foo0"), dir("foo"), file("foo.txt"), file("bar")]);
        let names = tree.entries().map(|e| e.name()).collect::<Vec<_>>();

        assert_eq!(names, vec!["bar", "foo.txt", "foo", "foo0"]);
    }

    #[test]
    fn serialized_tree_hashes_like_git() {
        // `git mktree` of a single empty file named "a"
        let empty_blob = ObjectId::try_parse("e69de29bb2d1d6434b8b29ae775ad8c2e48c5391").unwrap();
        let tree = Tree::new(vec![TreeEntry::new(
            "a".to_string(),
            EntryMode::File(FileMode::Regular),
            empty_blob,
        )]);

        assert_eq!(
            tree.object_id().to_hex(),
            "496d6428b9cf92981dc9495211e6e1120fb6f2ba"
        );
    }

    #[test]
    fn parses_serialized_payload() {
        let tree = Tree::new(vec![file("README"), dir("src")]);
        let parsed = Tree::deserialize(tree.serialize_payload()).unwrap();

        assert_eq!(parsed, tree);
        assert!(parsed.get("src").unwrap().is_tree());
    }

    #[test]
    fn truncated_payload_is_corrupt() {
        let payload = Bytes::from_static(b"100644 file\0\x01\x02");
        assert!(matches!(
            Tree::deserialize(payload),
            Err(Error::CorruptObject { .. })
        ));
    }

    #[test]
    fn names_that_are_not_utf8_stay_distinct() {
        let mut payload = Vec::new();
        for name in [&b"n\xfe"[..], &b"n\xff"[..]] {
            payload.extend_from_slice(b"100644 ");
            payload.extend_from_slice(name);
            payload.push(0);
            payload.extend_from_slice(&[7; 20]);
        }
        let payload = Bytes::from(payload);

        let tree = Tree::deserialize(payload.clone()).unwrap();

        let names = tree.entries().map(TreeEntry::name_bytes).collect::<Vec<_>>();
        assert_eq!(names, vec![&b"n\xfe"[..], &b"n\xff"[..]]);
        assert_eq!(tree.serialize_payload(), payload);
    }
}
