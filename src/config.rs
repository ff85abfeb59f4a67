//! Configuration loaded from a TOML file
//!
//! ```toml
//! [repositories]
//! bit = "~/src/bit"
//! kernel = "/srv/git/linux.git"
//!
//! [engine]
//! context_lines = 3
//! rename_threshold = 50
//! ```

use crate::errors::{Error, IoResultExt, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Repository name to on-disk path
    #[serde(default)]
    pub repositories: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub engine: EngineSettings,
}

/// Tunables of the object store, diff and history engines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Unchanged lines shown around each change run in a hunk
    pub context_lines: usize,
    /// Minimum similarity (percent) for a delete/add pair to count as a rename
    pub rename_threshold: u8,
    /// Rename scoring is skipped when either side has more candidates than this
    pub rename_limit: usize,
    /// Longest delta chain followed before a pack entry is declared corrupt
    pub max_delta_depth: usize,
    pub stream_chunk_size: usize,
    pub commits_per_page: usize,
    pub search_per_page: usize,
    /// Bytes inspected when deciding whether a blob is binary
    pub binary_sniff_len: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            context_lines: 3,
            rename_threshold: 50,
            rename_limit: 200,
            max_delta_depth: 1024,
            stream_chunk_size: 4096,
            commits_per_page: 15,
            search_per_page: 50,
            binary_sniff_len: 8000,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).with_path(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Resolve a configured repository name to its path, expanding a leading `~`
    pub fn repository_path(&self, name: &str) -> Result<PathBuf> {
        let path = self
            .repositories
            .get(name)
            .ok_or_else(|| Error::RepositoryNotFound(PathBuf::from(name)))?;

        Ok(expand_home(path))
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}
