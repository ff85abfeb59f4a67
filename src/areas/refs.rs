//! Git references (branches, HEAD, tags)
//!
//! References are human-readable names pointing to objects. They can be:
//! - Direct: containing a 40-character object id
//! - Symbolic: pointing to another reference (e.g., HEAD -> refs/heads/master)
//!
//! ## Storage
//!
//! - Loose refs: one file per ref under the git directory
//! - `packed-refs`: `<oid> <name>` lines, optionally followed by a `^<oid>`
//!   line holding the peeled target of an annotated tag
//!
//! A loose ref shadows a packed ref of the same name.

use crate::artifacts::branch::branch_name::{BranchName, SymRefName, HEADS_PREFIX, TAGS_PREFIX};
use crate::artifacts::branch::{compiled, CompiledRegex};
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::{Error, IoResultExt, Result};
use derive_new::new;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Contents of a symbolic reference file
static SYMREF_REGEX: CompiledRegex = Lazy::new(|| Regex::new(r"^ref: (.+)$"));

/// Name of the HEAD reference
pub const HEAD_REF_NAME: &str = "HEAD";

/// Symbolic refs pointing at symbolic refs are followed this many times
const MAX_SYMREF_DEPTH: usize = 5;

/// Internal representation of a reference value
#[derive(Debug, Clone, PartialEq, Eq)]
enum SymRefOrOid {
    SymRef { sym_ref_name: SymRefName },
    Oid(ObjectId),
}

impl SymRefOrOid {
    fn read_symref_or_oid(path: &Path) -> Result<Option<SymRefOrOid>> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::NotFound
                        | io::ErrorKind::IsADirectory
                        | io::ErrorKind::NotADirectory
                ) =>
            {
                return Ok(None);
            }
            Err(_) if path.is_dir() => return Ok(None),
            Err(e) => return Err(e).with_path(path),
        };
        let content = content.trim();

        if content.is_empty() {
            return Ok(None);
        }

        let symref_match = compiled(&SYMREF_REGEX)?.captures(content);
        if let Some(symref_match) = symref_match {
            Ok(Some(SymRefOrOid::SymRef {
                sym_ref_name: SymRefName::new(symref_match[1].to_string()),
            }))
        } else {
            // FETCH_HEAD-style files carry annotations after the id
            let oid = content.split_whitespace().next().unwrap_or_default();
            ObjectId::try_parse(oid)
                .map(|oid| Some(SymRefOrOid::Oid(oid)))
                .map_err(|_| {
                    Error::CorruptRepository(format!(
                        "ref file {} holds neither an object id nor a symbolic ref",
                        path.display()
                    ))
                })
        }
    }
}

/// One line of `packed-refs`
#[derive(Debug, Clone, PartialEq, Eq)]
struct PackedRef {
    oid: ObjectId,
    peeled: Option<ObjectId>,
}

/// A named reference and the object it points at
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct Reference {
    /// Short name (`main`, `feature/x`, `v1.0`)
    pub name: String,
    pub oid: ObjectId,
}

/// What HEAD currently points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Head {
    /// Symbolic HEAD; the branch may not have any commit yet
    Branch(SymRefName),
    Detached(ObjectId),
}

/// Read-only access to the references of a repository
#[derive(Debug, new)]
pub struct Refs {
    /// Path to the git directory
    path: PathBuf,
}

impl Refs {
    pub fn head_path(&self) -> PathBuf {
        self.path.join(HEAD_REF_NAME)
    }

    pub fn refs_path(&self) -> PathBuf {
        self.path.join("refs")
    }

    pub fn heads_path(&self) -> PathBuf {
        self.refs_path().join("heads")
    }

    pub fn tags_path(&self) -> PathBuf {
        self.refs_path().join("tags")
    }

    fn packed_refs_path(&self) -> PathBuf {
        self.path.join("packed-refs")
    }

    fn read_packed_refs(&self) -> Result<BTreeMap<SymRefName, PackedRef>> {
        let path = self.packed_refs_path();
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e).with_path(path),
        };

        let corrupt = |line: &str| {
            Error::CorruptRepository(format!("malformed packed-refs line '{line}'"))
        };

        let mut refs: BTreeMap<SymRefName, PackedRef> = BTreeMap::new();
        let mut last: Option<SymRefName> = None;
        for line in content.lines() {
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }

            if let Some(peeled) = line.strip_prefix('^') {
                let peeled = ObjectId::try_parse(peeled.trim()).map_err(|_| corrupt(line))?;
                let entry = last
                    .as_ref()
                    .and_then(|name| refs.get_mut(name))
                    .ok_or_else(|| corrupt(line))?;
                entry.peeled = Some(peeled);
                continue;
            }

            let (oid, name) = line.split_once(' ').ok_or_else(|| corrupt(line))?;
            let oid = ObjectId::try_parse(oid).map_err(|_| corrupt(line))?;
            let name = SymRefName::new(name.trim().to_string());
            refs.insert(name.clone(), PackedRef { oid, peeled: None });
            last = Some(name);
        }

        Ok(refs)
    }

    /// Follow a full ref name to the object it designates
    fn read_symref(&self, name: &SymRefName, depth: usize) -> Result<Option<ObjectId>> {
        if depth > MAX_SYMREF_DEPTH {
            return Err(Error::CorruptRepository(format!(
                "symbolic ref {name} nests deeper than {MAX_SYMREF_DEPTH} levels"
            )));
        }

        match SymRefOrOid::read_symref_or_oid(&self.path.join(name.as_ref_path()))? {
            Some(SymRefOrOid::SymRef { sym_ref_name }) => {
                self.read_symref(&sym_ref_name, depth + 1)
            }
            Some(SymRefOrOid::Oid(oid)) => Ok(Some(oid)),
            None => Ok(self.read_packed_refs()?.get(name).map(|packed| packed.oid)),
        }
    }

    pub fn read_head(&self) -> Result<Option<ObjectId>> {
        self.read_symref(&SymRefName::new(HEAD_REF_NAME.to_string()), 0)
    }

    pub fn head(&self) -> Result<Head> {
        match SymRefOrOid::read_symref_or_oid(&self.head_path())? {
            Some(SymRefOrOid::SymRef { sym_ref_name }) => Ok(Head::Branch(sym_ref_name)),
            Some(SymRefOrOid::Oid(oid)) => Ok(Head::Detached(oid)),
            None => Err(Error::CorruptRepository("HEAD is missing or empty".into())),
        }
    }

    /// Resolve a short or full ref name using git's lookup order
    ///
    /// Names directly under the git directory are only considered when they
    /// are full ref names or look like `HEAD`, `FETCH_HEAD` and friends, so
    /// `config` or `description` are never mistaken for refs.
    pub fn read_ref(&self, name: &str) -> Result<Option<ObjectId>> {
        let Ok(branch_name) = BranchName::try_parse(name) else {
            return Ok(None);
        };

        let top_level = name.starts_with("refs/")
            || name.chars().all(|c| c.is_ascii_uppercase() || c == '_');

        for (position, candidate) in branch_name.candidates().iter().enumerate() {
            if position == 0 && !top_level {
                continue;
            }
            if let Some(oid) = self.read_symref(candidate, 0)? {
                tracing::debug!(%name, resolved = %candidate, %oid, "resolved ref");
                return Ok(Some(oid));
            }
        }

        Ok(None)
    }

    /// Peeled target recorded in `packed-refs` for an annotated tag
    pub fn packed_peeled(&self, name: &SymRefName) -> Result<Option<ObjectId>> {
        Ok(self
            .read_packed_refs()?
            .get(name)
            .and_then(|packed| packed.peeled))
    }

    pub fn list_branches(&self) -> Result<Vec<Reference>> {
        self.list_refs(HEADS_PREFIX, &self.heads_path())
    }

    pub fn list_tags(&self) -> Result<Vec<Reference>> {
        self.list_refs(TAGS_PREFIX, &self.tags_path())
    }

    /// Loose and packed refs under `prefix`, sorted by short name
    fn list_refs(&self, prefix: &str, dir: &Path) -> Result<Vec<Reference>> {
        let mut refs: BTreeMap<String, ObjectId> = self
            .read_packed_refs()?
            .into_iter()
            .filter(|(name, _)| name.as_ref_path().starts_with(prefix))
            .map(|(name, packed)| (name.short_name().to_string(), packed.oid))
            .collect();

        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.io_error().map(io::Error::kind) == Some(io::ErrorKind::NotFound) => {
                    continue;
                }
                Err(e) => {
                    return Err(Error::Io {
                        path: dir.to_path_buf(),
                        source: e.into(),
                    });
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let relative_path = entry
                .path()
                .strip_prefix(&self.path)
                .map_err(|_| Error::CorruptRepository("ref outside git directory".into()))?;
            let name = SymRefName::new(relative_path.to_string_lossy().replace('\\', "/"));
            if let Some(oid) = self.read_symref(&name, 0)? {
                refs.insert(name.short_name().to_string(), oid);
            }
        }

        Ok(refs
            .into_iter()
            .map(|(name, oid)| Reference::new(name, oid))
            .collect())
    }
}
