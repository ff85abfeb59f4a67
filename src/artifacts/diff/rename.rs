use crate::areas::database::Database;
use crate::artifacts::diff::tree_diff::{ChangeSet, FileDiff, FileStatus};
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::Result;
use std::collections::{HashMap, HashSet};

/// Pair deleted files with added files that carry (nearly) the same content
///
/// Identical blobs pair first. The remaining candidates are scored by line
/// similarity, `2 * common / (old + new)`, and paired greedily from the best
/// score down; pairs below `threshold` percent stay a deletion plus an
/// addition. Nothing is scored when either side has more than `limit`
/// candidates.
pub fn detect_renames(
    database: &Database,
    changes: &mut ChangeSet,
    threshold: u8,
    limit: usize,
) -> Result<()> {
    let candidate = |change: &&FileDiff, status: FileStatus| {
        change.status == status
            && [&change.old, &change.new]
                .into_iter()
                .flatten()
                .all(|entry| entry.mode.is_blob())
    };
    let deleted = changes
        .values()
        .filter(|change| candidate(change, FileStatus::Deleted))
        .map(|change| change.path.clone())
        .collect::<Vec<_>>();
    let added = changes
        .values()
        .filter(|change| candidate(change, FileStatus::Added))
        .map(|change| change.path.clone())
        .collect::<Vec<_>>();

    if deleted.is_empty() || added.is_empty() {
        return Ok(());
    }

    let oid_of = |changes: &ChangeSet, path: &str| -> Option<ObjectId> {
        let change = changes.get(path)?;
        change.old.as_ref().or(change.new.as_ref()).map(|entry| entry.oid)
    };

    let mut pairs: Vec<(String, String, u8)> = Vec::new();
    let mut used_deleted = HashSet::new();
    let mut used_added = HashSet::new();

    // exact content matches
    let mut by_oid: HashMap<ObjectId, Vec<&String>> = HashMap::new();
    for path in &deleted {
        if let Some(oid) = oid_of(changes, path) {
            by_oid.entry(oid).or_default().push(path);
        }
    }
    for path in &added {
        let Some(oid) = oid_of(changes, path) else {
            continue;
        };
        let unused = by_oid.get(&oid).and_then(|sources| {
            sources
                .iter()
                .find(|source| !used_deleted.contains(source.as_str()))
        });
        if let Some(from) = unused {
            used_deleted.insert((*from).clone());
            used_added.insert(path.clone());
            pairs.push(((*from).clone(), path.clone(), 100));
        }
    }

    let remaining_deleted = deleted
        .iter()
        .filter(|path| !used_deleted.contains(*path))
        .collect::<Vec<_>>();
    let remaining_added = added
        .iter()
        .filter(|path| !used_added.contains(*path))
        .collect::<Vec<_>>();

    if remaining_deleted.len() > limit || remaining_added.len() > limit {
        tracing::debug!(
            deleted = remaining_deleted.len(),
            added = remaining_added.len(),
            limit,
            "too many rename candidates, skipping similarity scoring"
        );
    } else if !remaining_deleted.is_empty() && !remaining_added.is_empty() {
        let load = |path: &String| -> Result<Vec<u8>> {
            match oid_of(changes, path) {
                Some(oid) => Ok(database.parse_object_as_blob(&oid)?.into_content().to_vec()),
                None => Ok(Vec::new()),
            }
        };
        let old_contents = remaining_deleted
            .iter()
            .map(|path| load(path))
            .collect::<Result<Vec<_>>>()?;
        let new_contents = remaining_added
            .iter()
            .map(|path| load(path))
            .collect::<Result<Vec<_>>>()?;

        let mut scored = Vec::new();
        for (i, old) in old_contents.iter().enumerate() {
            for (j, new) in new_contents.iter().enumerate() {
                let score = similarity(old, new);
                if score >= threshold {
                    scored.push((score, i, j));
                }
            }
        }
        // best score first; ties by path order
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.2.cmp(&b.2)).then(a.1.cmp(&b.1)));

        for (score, i, j) in scored {
            let (from, to) = (remaining_deleted[i], remaining_added[j]);
            if used_deleted.contains(from) || used_added.contains(to) {
                continue;
            }
            used_deleted.insert(from.clone());
            used_added.insert(to.clone());
            pairs.push((from.clone(), to.clone(), score));
        }
    }

    for (from, to, similarity) in pairs {
        let Some(source) = changes.remove(&from) else {
            continue;
        };
        if let Some(target) = changes.get_mut(&to) {
            tracing::debug!(%from, %to, similarity, "detected rename");
            target.status = FileStatus::Renamed { from, similarity };
            target.old = source.old;
        }
    }

    Ok(())
}

/// Percentage of lines the two contents share
pub fn similarity(old: &[u8], new: &[u8]) -> u8 {
    if old == new {
        return 100;
    }

    let lines = |content: &[u8]| -> Vec<Vec<u8>> {
        content
            .split_inclusive(|&byte| byte == b'\n')
            .map(<[u8]>::to_vec)
            .collect()
    };
    let old_lines = lines(old);
    let new_lines = lines(new);
    let total = old_lines.len() + new_lines.len();
    if total == 0 {
        return 100;
    }

    let mut counts: HashMap<&[u8], usize> = HashMap::new();
    for line in &old_lines {
        *counts.entry(line.as_slice()).or_default() += 1;
    }
    let common = new_lines
        .iter()
        .filter(|line| match counts.get_mut(line.as_slice()) {
            Some(count) if *count > 0 => {
                *count -= 1;
                true
            }
            _ => false,
        })
        .count();

    ((2 * common * 100) / total).min(100) as u8
}
