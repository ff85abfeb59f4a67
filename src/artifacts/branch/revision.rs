use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::branch::{compiled, ANCESTOR_REGEX, PARENT_REGEX, REF_ALIASES};
use crate::artifacts::objects::object::ObjectBox;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::OBJECT_ID_LENGTH;
use crate::errors::{Error, Result};

/// Tags pointing at tags are peeled at most this many times
const MAX_PEEL_DEPTH: usize = 16;

/// Represents a revision specification that can be used to identify commits.
///
/// Supports multiple formats:
/// - Branch/ref names: `main`, `feature/new-feature`, `HEAD`, `v1.0`
/// - Aliases: `@` (resolves to `HEAD`)
/// - Full OIDs: 40-character hexadecimal strings
/// - Abbreviated OIDs: 4-39 hexadecimal characters
/// - Parent notation: `<revision>^` or `<revision>^<n>` (`^0` is the commit itself)
/// - Ancestor notation: `<revision>~` or `<revision>~<n>` (first-parent generations)
///
/// # Parsing Strategy
///
/// OID-like strings (e.g., "abc123") are parsed as `Ref` variants. During resolution,
/// if no ref with that name exists and the string looks like an OID (4-40 hex characters),
/// the resolver will attempt to resolve it as an object ID. This matches Git's behavior of
/// preferring refs over OIDs when there's ambiguity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Revision {
    /// A reference to a branch, tag, symbolic ref, or potentially an OID
    Ref(BranchName),
    /// The Nth ancestor of a revision along first parents (e.g., HEAD~3)
    Ancestor(Box<Revision>, usize),
    /// The Nth parent of a revision (e.g., HEAD^2 for the merged-in side)
    Parent(Box<Revision>, usize),
}

impl Revision {
    /// Resolve to a commit id, peeling annotated tags
    pub fn resolve(&self, repository: &Repository) -> Result<ObjectId> {
        match self {
            Revision::Ref(_) => {
                let oid = self.resolve_object(repository)?;
                Self::peel_to_commit(oid, repository)?
                    .ok_or_else(|| Error::RevisionNotFound(self.to_string()))
            }
            Revision::Parent(base_revision, 0) => base_revision.resolve(repository),
            Revision::Parent(base_revision, nth) => {
                let oid = base_revision.resolve(repository)?;
                let commit = repository.database().parse_object_as_commit(&oid)?;
                commit
                    .parents()
                    .get(nth - 1)
                    .copied()
                    .ok_or_else(|| Error::RevisionNotFound(self.to_string()))
            }
            Revision::Ancestor(base_revision, generations) => {
                let mut oid = base_revision.resolve(repository)?;
                for _ in 0..*generations {
                    let commit = repository.database().parse_object_as_commit(&oid)?;
                    oid = commit
                        .parent()
                        .copied()
                        .ok_or_else(|| Error::RevisionNotFound(self.to_string()))?;
                }

                Ok(oid)
            }
        }
    }

    /// Resolve to whatever object the expression names, without peeling
    pub fn resolve_object(&self, repository: &Repository) -> Result<ObjectId> {
        let Revision::Ref(branch_name) = self else {
            return self.resolve(repository);
        };
        let name = branch_name.as_ref();

        // refs take precedence over object ids
        if let Some(oid) = repository.refs().read_ref(name)? {
            return Ok(oid);
        }

        if Self::looks_like_oid(name) {
            Self::resolve_oid(name, repository)
        } else {
            Err(Error::RevisionNotFound(name.to_string()))
        }
    }

    fn peel_to_commit(oid: ObjectId, repository: &Repository) -> Result<Option<ObjectId>> {
        let mut oid = oid;
        for _ in 0..MAX_PEEL_DEPTH {
            let (object_type, _) = repository.database().read_header(&oid)?;
            match object_type {
                ObjectType::Commit => return Ok(Some(oid)),
                ObjectType::Tag => {
                    let tagged = match repository.database().parse_object(&oid)? {
                        ObjectBox::Tag(tag) => *tag.target(),
                        _ => return Ok(None),
                    };
                    if !repository.database().contains(&tagged)? {
                        return Err(Error::ObjectNotFound(tagged).referenced_by(&oid));
                    }
                    oid = tagged;
                }
                ObjectType::Blob | ObjectType::Tree => return Ok(None),
            }
        }

        Err(Error::CorruptRepository(format!(
            "tag chain starting at {oid} is longer than {MAX_PEEL_DEPTH}"
        )))
    }

    fn resolve_oid(oid_str: &str, repository: &Repository) -> Result<ObjectId> {
        if oid_str.len() == OBJECT_ID_LENGTH {
            let oid = ObjectId::try_parse(oid_str)?;
            return if repository.database().contains(&oid)? {
                Ok(oid)
            } else {
                Err(Error::RevisionNotFound(oid_str.to_string()))
            };
        }

        let mut matches = repository.database().find_objects_by_prefix(oid_str)?;
        match matches.len() {
            0 => Err(Error::RevisionNotFound(oid_str.to_string())),
            1 => Ok(matches.remove(0)),
            _ => Err(Error::AmbiguousRevision {
                revision: oid_str.to_string(),
                candidates: matches,
            }),
        }
    }

    pub fn try_parse(revision: &str) -> Result<Revision> {
        if let Some(caps) = compiled(&PARENT_REGEX)?.captures(revision) {
            let base_revision = Self::try_parse(&caps[1])?;
            let nth = Self::parse_count(&caps[2], revision)?;

            Ok(Revision::Parent(Box::new(base_revision), nth))
        } else if let Some(caps) = compiled(&ANCESTOR_REGEX)?.captures(revision) {
            let base_revision = Self::try_parse(&caps[1])?;
            let generations = Self::parse_count(&caps[2], revision)?;

            Ok(Revision::Ancestor(Box::new(base_revision), generations))
        } else {
            let resolved_name = *REF_ALIASES.get(revision).unwrap_or(&revision);
            Ok(Revision::Ref(BranchName::try_parse(resolved_name)?))
        }
    }

    /// `^` and `~` without a number mean 1
    fn parse_count(digits: &str, revision: &str) -> Result<usize> {
        if digits.is_empty() {
            return Ok(1);
        }
        digits
            .parse()
            .map_err(|_| Error::RevisionNotFound(revision.to_string()))
    }

    pub fn looks_like_oid(s: &str) -> bool {
        // at least 4 characters, the shortest abbreviation git accepts
        s.len() >= 4 && s.len() <= OBJECT_ID_LENGTH && s.chars().all(|c| c.is_ascii_hexdigit())
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Revision::Ref(name) => write!(f, "{name}"),
            Revision::Parent(base, nth) => write!(f, "{base}^{nth}"),
            Revision::Ancestor(base, generations) => write!(f, "{base}~{generations}"),
        }
    }
}
