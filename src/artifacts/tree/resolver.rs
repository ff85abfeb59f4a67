use crate::areas::database::Database;
use crate::artifacts::objects::entry_mode::EntryMode;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::{Tree, TreeEntry};
use crate::errors::{Error, Result};
use std::vec::IntoIter;

/// Split a repository path into its non-empty components
pub fn path_components(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|component| !component.is_empty())
}

/// Load a tree that another object refers to
pub fn load_tree(database: &Database, oid: &ObjectId, referrer: &ObjectId) -> Result<Tree> {
    database
        .parse_object_as_tree(oid)
        .map_err(|e| e.referenced_by(referrer))
}

/// Entry at `path` below the tree `root`
///
/// An empty path names the root itself, reported as a nameless directory
/// entry. Missing components and components that index into a non-directory
/// fail with `PathNotFound`.
pub fn resolve_path(database: &Database, root: &ObjectId, path: &str) -> Result<TreeEntry> {
    let mut current = TreeEntry::new(String::new(), EntryMode::Directory, *root);

    for component in path_components(path) {
        if !current.is_tree() {
            return Err(Error::PathNotFound(path.to_string()));
        }

        let tree = load_tree(database, &current.oid, root)?;
        current = tree
            .get(component)
            .cloned()
            .ok_or_else(|| Error::PathNotFound(path.to_string()))?;
    }

    Ok(current)
}

/// Like `resolve_path`, but a missing path is `None` instead of an error
pub fn find_entry(database: &Database, root: &ObjectId, path: &str) -> Result<Option<TreeEntry>> {
    match resolve_path(database, root, path) {
        Ok(entry) => Ok(Some(entry)),
        Err(Error::PathNotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Entries of a tree in canonical order, with blob sizes filled in
pub fn list_directory(database: &Database, tree_oid: &ObjectId) -> Result<Vec<TreeEntry>> {
    let tree = database.parse_object_as_tree(tree_oid)?;

    tree.into_entries()
        .map(|mut entry| {
            if entry.mode.is_blob() {
                let (_, size) = database
                    .read_header(&entry.oid)
                    .map_err(|e| e.referenced_by(tree_oid))?;
                entry.size = Some(size);
            }
            Ok(entry)
        })
        .collect()
}

/// First blob whose name starts with `readme`, ignoring case
pub fn find_readme(database: &Database, tree_oid: &ObjectId) -> Result<Option<TreeEntry>> {
    let tree = database.parse_object_as_tree(tree_oid)?;

    Ok(tree
        .into_entries()
        .find(|entry| {
            entry.mode.is_blob()
                && entry
                    .name_bytes()
                    .get(..6)
                    .is_some_and(|prefix| prefix.eq_ignore_ascii_case(b"readme"))
        }))
}

/// An entry reached while traversing a tree, with its full path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeItem {
    pub path: String,
    pub entry: TreeEntry,
}

/// Depth-first, pre-order traversal of a tree in canonical order
///
/// Directories are yielded before their contents. Subtrees are loaded only
/// when the traversal reaches them.
pub struct TreeWalker<'d> {
    database: &'d Database,
    root: ObjectId,
    stack: Vec<(String, IntoIter<TreeEntry>)>,
    failed: bool,
}

impl<'d> TreeWalker<'d> {
    pub fn new(database: &'d Database, root: ObjectId) -> Result<Self> {
        let tree = database.parse_object_as_tree(&root)?;

        Ok(TreeWalker {
            database,
            root,
            stack: vec![(String::new(), tree.into_entries().collect::<Vec<_>>().into_iter())],
            failed: false,
        })
    }

    /// Only the entries that carry file content (blobs, symlinks, submodules)
    pub fn files(self) -> impl Iterator<Item = Result<TreeItem>> + 'd {
        self.filter(|item| !matches!(item, Ok(item) if item.entry.is_tree()))
    }
}

impl Iterator for TreeWalker<'_> {
    type Item = Result<TreeItem>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            let (prefix, entries) = self.stack.last_mut()?;
            let Some(entry) = entries.next() else {
                self.stack.pop();
                continue;
            };

            let path = if prefix.is_empty() {
                entry.name().into_owned()
            } else {
                format!("{prefix}/{}", entry.name())
            };

            if entry.is_tree() {
                match load_tree(self.database, &entry.oid, &self.root) {
                    Ok(subtree) => self.stack.push((
                        path.clone(),
                        subtree.into_entries().collect::<Vec<_>>().into_iter(),
                    )),
                    Err(e) => {
                        self.failed = true;
                        return Some(Err(e));
                    }
                }
            }

            return Some(Ok(TreeItem { path, entry }));
        }
    }
}
