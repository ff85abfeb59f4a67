//! Command implementations
//!
//! This module contains all command implementations, organized into two categories
//! following Git's architecture:
//!
//! - `plumbing`: Low-level commands for direct object access (cat-file, ls-tree, rev-parse)
//! - `porcelain`: User-facing views (log, show, diff, blame, ...)
//!
//! Every command is an `impl Repository` block writing to the repository's writer.

pub mod plumbing;
pub mod porcelain;
