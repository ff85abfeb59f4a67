//! Error taxonomy for the object store and history engine
//!
//! Store-level corruption and not-found conditions are never recovered inside
//! the engine; they travel to the caller as one of these variants.

use crate::artifacts::objects::object_id::ObjectId;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("repository not found at {0}")]
    RepositoryNotFound(PathBuf),

    #[error("not a git repository: {0}")]
    NotAGitRepository(PathBuf),

    #[error("object {0} not found")]
    ObjectNotFound(ObjectId),

    #[error("corrupt object {object}: {reason}")]
    CorruptObject { object: String, reason: String },

    #[error("corrupt repository: {0}")]
    CorruptRepository(String),

    #[error("unknown revision '{0}'")]
    RevisionNotFound(String),

    #[error("short object id {revision} is ambiguous ({} candidates)", candidates.len())]
    AmbiguousRevision {
        revision: String,
        candidates: Vec<ObjectId>,
    },

    #[error("'{0}' does not name a revision or a path on the default branch")]
    InvalidCommitish(String),

    #[error("path '{0}' does not exist in the given tree")]
    PathNotFound(String),

    #[error("operation aborted")]
    Aborted,

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("unknown archive format '{0}' (expected zip or tar)")]
    UnknownArchiveFormat(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn corrupt(object: impl std::fmt::Display, reason: impl Into<String>) -> Self {
        Error::CorruptObject {
            object: object.to_string(),
            reason: reason.into(),
        }
    }

    /// Reclassify an object missing behind `referrer`'s reference as corruption
    pub fn referenced_by(self, referrer: &ObjectId) -> Self {
        match self {
            Error::ObjectNotFound(missing) => Error::CorruptRepository(format!(
                "object {referrer} references missing object {missing}"
            )),
            other => other,
        }
    }

    /// Whether the error belongs to the not-found family.
    ///
    /// Presentation layers map these to a "not found" response and every other
    /// variant to a generic failure.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::RepositoryNotFound(_)
                | Error::NotAGitRepository(_)
                | Error::ObjectNotFound(_)
                | Error::RevisionNotFound(_)
                | Error::InvalidCommitish(_)
                | Error::PathNotFound(_)
        )
    }
}

/// Wrap io errors with the path that produced them
pub trait IoResultExt<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|source| Error::Io {
            path: path.into(),
            source,
        })
    }
}
