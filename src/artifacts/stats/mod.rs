//! Repository statistics at a commit
//!
//! Authors are counted over the history reachable from the commit, file
//! counts and sizes over its tree.

use crate::areas::database::Database;
use crate::artifacts::core::AbortSignal;
use crate::artifacts::log::rev_list::{HistoryQuery, RevList};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::tree::resolver::TreeWalker;
use crate::errors::Result;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorStats {
    pub name: String,
    pub email: String,
    pub commits: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryStats {
    /// Most active first
    pub authors: Vec<AuthorStats>,
    /// File extensions by number of files, most common first
    pub extensions: Vec<(String, usize)>,
    pub files: usize,
    /// Total size of all file contents, in bytes
    pub size: u64,
}

/// Extension used to group files; files without one are grouped under their
/// full name (`Makefile`, `LICENSE`)
fn extension_of(path: &str) -> String {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    Path::new(file_name)
        .extension()
        .map(|extension| extension.to_string_lossy().to_lowercase())
        .unwrap_or_else(|| file_name.to_string())
}

pub fn collect_stats(
    database: &Database,
    commit: ObjectId,
    abort: Option<&AbortSignal>,
) -> Result<RepositoryStats> {
    let query = HistoryQuery {
        abort: abort.cloned(),
        ..HistoryQuery::default()
    };

    let mut authors: HashMap<(String, String), usize> = HashMap::new();
    for node in RevList::new(database, commit, query)? {
        let node = node?;
        let author = node.commit.author();
        *authors
            .entry((author.name().to_string(), author.email().to_string()))
            .or_default() += 1;
    }

    let mut extensions: HashMap<String, usize> = HashMap::new();
    let mut stats = RepositoryStats::default();
    let tree_oid = *database.parse_object_as_commit(&commit)?.tree_oid();
    for item in TreeWalker::new(database, tree_oid)?.files() {
        let item = item?;
        if !item.entry.mode.is_blob() {
            continue;
        }
        if let Some(abort) = abort {
            abort.check()?;
        }

        let (_, size) = database
            .read_header(&item.entry.oid)
            .map_err(|e| e.referenced_by(&tree_oid))?;
        stats.files += 1;
        stats.size += size;
        *extensions.entry(extension_of(&item.path)).or_default() += 1;
    }

    stats.authors = authors
        .into_iter()
        .map(|((name, email), commits)| AuthorStats {
            name,
            email,
            commits,
        })
        .collect();
    stats.authors.sort_by(|a, b| {
        b.commits
            .cmp(&a.commits)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.email.cmp(&b.email))
    });

    stats.extensions = extensions.into_iter().collect();
    stats
        .extensions
        .sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("src/main.rs", "rs")]
    #[case("docs/Guide.MD", "md")]
    #[case("Makefile", "Makefile")]
    #[case("archive.tar.gz", "gz")]
    #[case(".gitignore", ".gitignore")]
    fn groups_files_by_extension(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(extension_of(path), expected);
    }
}
