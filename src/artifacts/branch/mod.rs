//! Revision names and commit-ish expressions
//!
//! - `branch_name`: validated ref names
//! - `revision`: `name`, `name^N`, `name~N` and abbreviated ids
//! - `commitish`: splitting `<revision>/<path>` strings

pub mod branch_name;
pub mod commitish;
pub mod revision;

use crate::errors::Result;
use once_cell::sync::Lazy;
use regex::Regex;

/// A pattern compiled on first use and shared for the life of the process
pub type CompiledRegex = Lazy<std::result::Result<Regex, regex::Error>>;

pub static INVALID_BRANCH_NAME_REGEX: CompiledRegex = Lazy::new(|| {
    Regex::new(r"^\.|\/\.|\.\.|^\/|\/$|\.lock$|@\{|[\x00-\x20\*:\?\[\\~\^\x7f]")
});
pub static PARENT_REGEX: CompiledRegex = Lazy::new(|| Regex::new(r"^(.+)\^(\d*)$"));
pub static ANCESTOR_REGEX: CompiledRegex = Lazy::new(|| Regex::new(r"^(.+)\~(\d*)$"));

pub fn compiled(regex: &'static CompiledRegex) -> Result<&'static Regex> {
    regex.as_ref().map_err(|e| e.clone().into())
}
pub const REF_ALIASES: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "@" => "HEAD",
};
