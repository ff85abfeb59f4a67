use crate::artifacts::branch::{compiled, INVALID_BRANCH_NAME_REGEX};
use crate::errors::{Error, Result};
use derive_new::new;

pub const HEADS_PREFIX: &str = "refs/heads/";
pub const TAGS_PREFIX: &str = "refs/tags/";
pub const REMOTES_PREFIX: &str = "refs/remotes/";

/// Full name of a reference as stored under the git directory
/// (`HEAD`, `refs/heads/main`, `refs/tags/v1.0`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord, new)]
pub struct SymRefName(String);

impl SymRefName {
    pub fn is_detached_head(&self) -> bool {
        self.0 == "HEAD"
    }

    pub fn as_ref_path(&self) -> &str {
        &self.0
    }

    pub fn is_branch(&self) -> bool {
        self.0.starts_with(HEADS_PREFIX)
    }

    pub fn is_tag(&self) -> bool {
        self.0.starts_with(TAGS_PREFIX)
    }

    /// Name without its `refs/heads/`, `refs/tags/` or `refs/remotes/` prefix
    pub fn short_name(&self) -> &str {
        [HEADS_PREFIX, TAGS_PREFIX, REMOTES_PREFIX]
            .iter()
            .find_map(|prefix| self.0.strip_prefix(prefix))
            .unwrap_or(&self.0)
    }
}

impl std::fmt::Display for SymRefName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A syntactically valid ref name, as accepted by `git check-ref-format`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct BranchName(String);

impl BranchName {
    pub fn try_parse(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::RevisionNotFound(name.to_string()));
        }

        if compiled(&INVALID_BRANCH_NAME_REGEX)?.is_match(name) {
            Err(Error::RevisionNotFound(name.to_string()))
        } else {
            Ok(Self(name.to_string()))
        }
    }

    pub fn try_parse_sym_ref_name(sym_ref_name: &SymRefName) -> Result<Self> {
        if !sym_ref_name.is_branch() {
            return Err(Error::RevisionNotFound(sym_ref_name.to_string()));
        }

        Self::try_parse(sym_ref_name.short_name())
    }

    /// Candidate full ref names, in lookup order
    pub fn candidates(&self) -> [SymRefName; 6] {
        let name = &self.0;
        [
            SymRefName::new(name.clone()),
            SymRefName::new(format!("refs/{name}")),
            SymRefName::new(format!("{TAGS_PREFIX}{name}")),
            SymRefName::new(format!("{HEADS_PREFIX}{name}")),
            SymRefName::new(format!("{REMOTES_PREFIX}{name}")),
            SymRefName::new(format!("{REMOTES_PREFIX}{name}/HEAD")),
        ]
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
