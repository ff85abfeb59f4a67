use crate::areas::database::Database;
use crate::artifacts::diff::path_filter::PathFilter;
use crate::artifacts::diff::rename;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::TreeEntry;
use crate::errors::Result;
use bitflags::bitflags;
use std::collections::BTreeMap;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct DiffFilter: u32 {
        const ADDED = 0b0001;
        const DELETED = 0b0010;
        const MODIFIED = 0b0100;
        const RENAMED = 0b1000;
    }
}

impl DiffFilter {
    pub fn try_parse(s: &str) -> Option<Self> {
        let mut filter = Self::empty();

        for c in s.chars() {
            match c {
                'A' => filter |= Self::ADDED,
                'D' => filter |= Self::DELETED,
                'M' => filter |= Self::MODIFIED,
                'R' => filter |= Self::RENAMED,
                _ => return None,
            }
        }

        Some(filter)
    }
}

impl Default for DiffFilter {
    fn default() -> Self {
        Self::all()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Added,
    Deleted,
    Modified,
    /// Moved from `from`; `similarity` is a percentage
    Renamed { from: String, similarity: u8 },
}

/// One changed file between two trees
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub status: FileStatus,
    /// Path in the new tree (the old path for deletions)
    pub path: String,
    pub old: Option<TreeEntry>,
    pub new: Option<TreeEntry>,
}

impl FileDiff {
    pub fn from_entries(
        path: String,
        old: Option<TreeEntry>,
        new: Option<TreeEntry>,
    ) -> Option<Self> {
        let status = match (&old, &new) {
            (None, Some(_)) => FileStatus::Added,
            (Some(_), None) => FileStatus::Deleted,
            (Some(old), Some(new)) if old.oid != new.oid || old.mode != new.mode => {
                FileStatus::Modified
            }
            _ => return None,
        };

        Some(FileDiff {
            status,
            path,
            old,
            new,
        })
    }

    pub fn matches_filter(&self, filter: DiffFilter) -> bool {
        match self.status {
            FileStatus::Added => filter.contains(DiffFilter::ADDED),
            FileStatus::Deleted => filter.contains(DiffFilter::DELETED),
            FileStatus::Modified => filter.contains(DiffFilter::MODIFIED),
            FileStatus::Renamed { .. } => filter.contains(DiffFilter::RENAMED),
        }
    }

    pub fn status_char(&self) -> char {
        match self.status {
            FileStatus::Added => 'A',
            FileStatus::Deleted => 'D',
            FileStatus::Modified => 'M',
            FileStatus::Renamed { .. } => 'R',
        }
    }

    /// Path on the old side of the change
    pub fn old_path(&self) -> &str {
        match &self.status {
            FileStatus::Renamed { from, .. } => from,
            _ => &self.path,
        }
    }
}

/// What to compare and how
#[derive(Debug, Clone)]
pub struct DiffOptions {
    pub paths: Vec<String>,
    pub filter: DiffFilter,
    pub detect_renames: bool,
    /// Minimum similarity percentage for a rename
    pub rename_threshold: u8,
    /// Rename detection is skipped when either side has more candidates
    pub rename_limit: usize,
}

impl Default for DiffOptions {
    fn default() -> Self {
        DiffOptions {
            paths: Vec::new(),
            filter: DiffFilter::all(),
            detect_renames: true,
            rename_threshold: 50,
            rename_limit: 200,
        }
    }
}

pub type ChangeSet = BTreeMap<String, FileDiff>;
/// Entries of one tree keyed by their raw name
pub type TreeEntryMap = BTreeMap<Vec<u8>, TreeEntry>;

/// Recursive comparison of two trees, pruned by a path filter
///
/// Only subtrees whose ids differ are descended into. A path that is a file on
/// one side and a directory on the other is reported as the file's deletion or
/// addition plus the directory's contents.
#[derive(Debug)]
pub struct TreeDiff<'r> {
    database: &'r Database,
    change_set: ChangeSet,
}

impl<'r> TreeDiff<'r> {
    pub fn new(database: &'r Database) -> Self {
        TreeDiff {
            database,
            change_set: BTreeMap::new(),
        }
    }

    pub fn changes(&self) -> &ChangeSet {
        &self.change_set
    }

    pub fn into_changes(self) -> ChangeSet {
        self.change_set
    }

    pub fn compare_oids(
        &mut self,
        old: Option<&ObjectId>,
        new: Option<&ObjectId>,
        filter: &PathFilter,
    ) -> Result<()> {
        if old == new {
            return Ok(());
        }

        let old_tree_entries = self.inflate_oid_to_tree_entries(old)?;
        let new_tree_entries = self.inflate_oid_to_tree_entries(new)?;

        self.detect_deletions(&old_tree_entries, &new_tree_entries, filter)?;
        self.detect_additions(&old_tree_entries, &new_tree_entries, filter)?;

        Ok(())
    }

    fn inflate_oid_to_tree_entries(&self, oid: Option<&ObjectId>) -> Result<TreeEntryMap> {
        match oid {
            None => Ok(BTreeMap::new()),
            Some(oid) => Ok(self
                .database
                .parse_object_as_tree(oid)?
                .into_entries()
                .map(|entry| (entry.name_bytes().to_vec(), entry))
                .collect()),
        }
    }

    fn join(filter: &PathFilter, name: &str) -> String {
        if filter.path().is_empty() {
            name.to_string()
        } else {
            format!("{}/{name}", filter.path())
        }
    }

    fn detect_deletions(
        &mut self,
        old: &TreeEntryMap,
        new: &TreeEntryMap,
        filter: &PathFilter,
    ) -> Result<()> {
        for (raw_name, entry) in filter.filter_matching_entries(old.iter()) {
            let other = new.get(raw_name);

            if other == Some(entry) {
                continue;
            }

            let name = entry.name();
            let tree_a_oid = entry.is_tree().then_some(&entry.oid);
            let tree_b_oid = other.filter(|other| other.is_tree()).map(|other| &other.oid);
            if tree_a_oid.is_some() || tree_b_oid.is_some() {
                self.compare_oids(tree_a_oid, tree_b_oid, &filter.subfilter(&name))?;
            }

            let blob_a = (!entry.is_tree()).then(|| entry.clone());
            let blob_b = other.filter(|other| !other.is_tree()).cloned();

            let path = Self::join(filter, &name);
            if let Some(change) = FileDiff::from_entries(path.clone(), blob_a, blob_b) {
                self.change_set.insert(path, change);
            }
        }

        Ok(())
    }

    fn detect_additions(
        &mut self,
        old: &TreeEntryMap,
        new: &TreeEntryMap,
        filter: &PathFilter,
    ) -> Result<()> {
        for (raw_name, entry) in filter.filter_matching_entries(new.iter()) {
            if old.contains_key(raw_name) {
                continue;
            }

            let name = entry.name();
            if entry.is_tree() {
                self.compare_oids(None, Some(&entry.oid), &filter.subfilter(&name))?;
            } else {
                let path = Self::join(filter, &name);
                if let Some(change) = FileDiff::from_entries(path.clone(), None, Some(entry.clone()))
                {
                    self.change_set.insert(path, change);
                }
            }
        }

        Ok(())
    }
}

/// Changed files between two trees, sorted by path
///
/// A missing tree stands for the empty tree.
pub fn diff_trees(
    database: &Database,
    old_tree: Option<&ObjectId>,
    new_tree: Option<&ObjectId>,
    options: &DiffOptions,
) -> Result<Vec<FileDiff>> {
    let mut tree_diff = TreeDiff::new(database);
    tree_diff.compare_oids(old_tree, new_tree, &PathFilter::new(&options.paths))?;

    let mut changes = tree_diff.into_changes();
    if options.detect_renames {
        rename::detect_renames(
            database,
            &mut changes,
            options.rename_threshold,
            options.rename_limit,
        )?;
    }

    Ok(changes
        .into_values()
        .filter(|change| change.matches_filter(options.filter))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::objects::entry_mode::{EntryMode, FileMode};
    use rstest::rstest;

    fn entry(name: &str, byte: u8) -> TreeEntry {
        TreeEntry::new(
            name.to_string(),
            EntryMode::File(FileMode::Regular),
            ObjectId::from_raw([byte; 20]),
        )
    }

    #[test]
    fn entries_classify_into_statuses() {
        let added = FileDiff::from_entries("a".into(), None, Some(entry("a", 1))).unwrap();
        let deleted = FileDiff::from_entries("a".into(), Some(entry("a", 1)), None).unwrap();
        let modified =
            FileDiff::from_entries("a".into(), Some(entry("a", 1)), Some(entry("a", 2))).unwrap();

        assert_eq!(added.status, FileStatus::Added);
        assert_eq!(deleted.status, FileStatus::Deleted);
        assert_eq!(modified.status, FileStatus::Modified);
        assert!(FileDiff::from_entries("a".into(), Some(entry("a", 1)), Some(entry("a", 1))).is_none());
    }

    #[test]
    fn mode_change_alone_is_a_modification() {
        let mut executable = entry("run.sh", 1);
        executable.mode = EntryMode::File(FileMode::Executable);

        let change =
            FileDiff::from_entries("run.sh".into(), Some(entry("run.sh", 1)), Some(executable));
        assert_eq!(change.map(|c| c.status), Some(FileStatus::Modified));
    }

    #[rstest]
    #[case("AD", DiffFilter::ADDED | DiffFilter::DELETED)]
    #[case("MR", DiffFilter::MODIFIED | DiffFilter::RENAMED)]
    #[case("", DiffFilter::empty())]
    fn parses_filters(#[case] raw: &str, #[case] expected: DiffFilter) {
        assert_eq!(DiffFilter::try_parse(raw), Some(expected));
    }

    #[test]
    fn rejects_unknown_filter_letters() {
        assert_eq!(DiffFilter::try_parse("AX"), None);
    }

    #[test]
    fn renamed_changes_report_their_old_path() {
        let change = FileDiff {
            status: FileStatus::Renamed {
                from: "old.txt".into(),
                similarity: 100,
            },
            path: "new.txt".into(),
            old: Some(entry("old.txt", 1)),
            new: Some(entry("new.txt", 1)),
        };

        assert_eq!(change.old_path(), "old.txt");
        assert_eq!(change.status_char(), 'R');
        assert!(change.matches_filter(DiffFilter::RENAMED));
        assert!(!change.matches_filter(DiffFilter::ADDED | DiffFilter::DELETED));
    }
}
