//! Read-only access to git repositories for repository browsers
//!
//! `bitlist` reads loose and packed objects, resolves refs and revision
//! expressions, walks history, diffs trees and blobs, blames files and
//! writes archives, without ever writing to the repository.
//!
//! ```no_run
//! use bitlist::areas::repository::Repository;
//! use bitlist::artifacts::log::rev_list::HistoryQuery;
//!
//! # fn main() -> bitlist::errors::Result<()> {
//! let repository = Repository::open("/srv/git/bitlist.git")?;
//! let head = repository.resolve("HEAD")?;
//! for node in repository.walk_history(head, HistoryQuery::default().page(0, 15))? {
//!     println!("{}", node?.commit.short_message());
//! }
//! # Ok(())
//! # }
//! ```

pub mod areas;
pub mod artifacts;
pub mod commands;
pub mod config;
pub mod errors;

use clap::ValueEnum;

/// How `log` prints each commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CommitDisplayFormat {
    #[default]
    Medium,
    #[value(name = "oneline")]
    OneLine,
}
