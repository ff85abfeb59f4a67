//! Porcelain commands (user-facing views of a repository)
//!
//! Porcelain commands compose the engine operations into the views a
//! repository browser shows: history, commits, diffs, blame and friends.
//!
//! ## Commands
//!
//! - `log`: Show commit history, optionally filtered by path or message
//! - `show`: Show a commit and its patch
//! - `diff`: Show changes between two commits
//! - `blame`: Attribute each line of a file to a commit
//! - `branch`, `tag`: List references
//! - `archive`: Write a zip or tar snapshot of a commit
//! - `stats`: Summarise authors and files
//! - `grep`: Search file contents

pub mod archive;
pub mod blame;
pub mod branch;
pub mod diff;
pub mod grep;
pub mod log;
pub mod show;
pub mod stats;
