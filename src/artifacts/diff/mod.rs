//! Diff algorithms and tree comparison
//!
//! This module implements the diffing layers:
//!
//! - `myers`: Myers' O(ND) shortest edit script
//! - `hunks`: line splitting, hunk grouping with context, hunk application
//! - `blob_diff`: text/binary classification and blob-to-blob diffs
//! - `path_filter`: trie of selected paths used to prune tree walks
//! - `tree_diff`: tree-level diffing for detecting file changes
//! - `rename`: pairing deletions with additions by content similarity

pub mod blob_diff;
pub mod hunks;
pub mod myers;
pub mod path_filter;
pub mod rename;
pub mod tree_diff;

use crate::artifacts::diff::blob_diff::BlobDiff;
use crate::artifacts::diff::tree_diff::FileDiff;

/// A changed file together with its content diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePatch {
    pub diff: FileDiff,
    pub content: BlobDiff,
}
