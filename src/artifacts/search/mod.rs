//! Content search over the files of a tree

use crate::areas::database::Database;
use crate::artifacts::core::AbortSignal;
use crate::artifacts::diff::blob_diff::as_text;
use crate::artifacts::diff::hunks::split_lines;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::tree::resolver::TreeWalker;
use crate::errors::Result;
use regex::RegexBuilder;

/// Lines of context kept on each side of a match
pub const CONTEXT_LINES: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeMatch {
    pub path: String,
    /// 1-based
    pub line_number: usize,
    pub line: String,
    pub context_before: Vec<String>,
    pub context_after: Vec<String>,
}

/// Lines matching `pattern` (a case-insensitive regular expression) in every
/// text file of the tree; binary files are skipped
pub fn search_tree(
    database: &Database,
    tree_oid: ObjectId,
    pattern: &str,
    sniff_len: usize,
    abort: Option<&AbortSignal>,
) -> Result<Vec<TreeMatch>> {
    let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;
    let mut matches = Vec::new();

    for item in TreeWalker::new(database, tree_oid)?.files() {
        let item = item?;
        if let Some(abort) = abort {
            abort.check()?;
        }
        if !item.entry.mode.is_blob() {
            continue;
        }

        let blob = database
            .parse_object_as_blob(&item.entry.oid)
            .map_err(|e| e.referenced_by(&tree_oid))?;
        let Some(text) = as_text(blob.content(), sniff_len) else {
            continue;
        };

        let lines = split_lines(text)
            .into_iter()
            .map(|line| line.text)
            .collect::<Vec<_>>();
        let owned = |range: &[&str]| range.iter().map(|line| line.to_string()).collect();

        for (index, line) in lines.iter().enumerate() {
            if !regex.is_match(line) {
                continue;
            }

            let before = index.saturating_sub(CONTEXT_LINES);
            let after = (index + 1 + CONTEXT_LINES).min(lines.len());
            matches.push(TreeMatch {
                path: item.path.clone(),
                line_number: index + 1,
                line: line.to_string(),
                context_before: owned(&lines[before..index]),
                context_after: owned(&lines[index + 1..after]),
            });
        }
    }

    tracing::debug!(%pattern, %tree_oid, matches = matches.len(), "searched tree");
    Ok(matches)
}
