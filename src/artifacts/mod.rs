//! Git data structures and algorithms
//!
//! This module contains the value types and algorithms of the engine:
//!
//! - `archive`: zip and tar snapshots of a tree
//! - `blame`: per-line attribution
//! - `branch`: Branch names, revision parsing and commit-ish/path splitting
//! - `core`: Shared utilities (abort signal, pager wrapper)
//! - `diff`: Myers' line diff, hunks, tree diffing and rename detection
//! - `log`: Commit history traversal and filtering
//! - `objects`: Git object types (blob, tree, commit, tag)
//! - `search`: content search over a tree
//! - `stats`: author and file statistics
//! - `tree`: path resolution and blob streaming

pub mod archive;
pub mod blame;
pub mod branch;
pub mod core;
pub mod diff;
pub mod log;
pub mod objects;
pub mod search;
pub mod stats;
pub mod tree;
