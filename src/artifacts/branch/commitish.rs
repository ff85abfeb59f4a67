use crate::areas::repository::Repository;
use crate::artifacts::branch::revision::Revision;
use crate::artifacts::tree::resolver;
use crate::errors::{Error, Result};

/// Every way of cutting `combined` into a revision and a path, longest
/// revision first
pub fn prefix_splits(combined: &str) -> Vec<(String, String)> {
    let components = combined
        .split('/')
        .filter(|component| !component.is_empty())
        .collect::<Vec<_>>();

    (1..=components.len())
        .rev()
        .map(|cut| (components[..cut].join("/"), components[cut..].join("/")))
        .collect()
}

/// Split `branch/sub/dir/file` into the revision part and the path part
///
/// Ref names may contain slashes, so the longest prefix that resolves to a
/// commit wins. When no prefix resolves, the whole string is tried as a path
/// on the default branch. An ambiguous abbreviated id counts as a miss, and
/// is reported only when the fallback finds nothing either. Other lookup
/// errors stop the search.
pub fn split_commitish_path(repository: &Repository, combined: &str) -> Result<(String, String)> {
    let mut ambiguity = None;

    for (revision, path) in prefix_splits(combined) {
        let Ok(parsed) = Revision::try_parse(&revision) else {
            continue;
        };

        match parsed.resolve(repository) {
            Ok(oid) => {
                tracing::debug!(%combined, %revision, %path, %oid, "split commit-ish");
                return Ok((revision, path));
            }
            Err(Error::RevisionNotFound(_)) => continue,
            Err(e @ Error::AmbiguousRevision { .. }) => {
                ambiguity.get_or_insert(e);
            }
            Err(e) => return Err(e),
        }
    }

    let not_found = || ambiguity.unwrap_or_else(|| Error::InvalidCommitish(combined.to_string()));

    let path = prefix_splits(combined)
        .into_iter()
        .next()
        .map(|(whole, _)| whole)
        .unwrap_or_default();
    let default_revision = default_revision(repository)?;

    if path.is_empty() {
        return default_revision
            .map(|revision| (revision, path))
            .ok_or_else(not_found);
    }

    let (Some(revision), Some(head)) = (default_revision, repository.refs().read_head()?) else {
        return Err(not_found());
    };
    let tree_oid = *repository.database().parse_object_as_commit(&head)?.tree_oid();

    match resolver::find_entry(repository.database(), &tree_oid, &path)? {
        Some(_) => {
            tracing::debug!(%combined, %revision, %path, "commit-ish fell back to default branch");
            Ok((revision, path))
        }
        None => Err(not_found()),
    }
}

/// Short name of the branch HEAD points at, or the HEAD commit id when detached
fn default_revision(repository: &Repository) -> Result<Option<String>> {
    if let Some(branch) = repository.default_branch()? {
        return Ok(Some(branch));
    }

    Ok(repository.refs().read_head()?.map(|oid| oid.to_hex()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn owned(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(revision, path)| (revision.to_string(), path.to_string()))
            .collect()
    }

    #[test]
    fn splits_are_ordered_longest_revision_first() {
        assert_eq!(
            prefix_splits("main/src/app.go"),
            owned(&[
                ("main/src/app.go", ""),
                ("main/src", "app.go"),
                ("main", "src/app.go"),
            ])
        );
    }

    #[test]
    fn redundant_slashes_are_ignored() {
        assert_eq!(
            prefix_splits("/main//README/"),
            owned(&[("main/README", ""), ("main", "README")])
        );
        assert!(prefix_splits("").is_empty());
    }
}
