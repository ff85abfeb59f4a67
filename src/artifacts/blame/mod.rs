//! Line attribution
//!
//! Blame starts with every line of the file suspected on the starting commit
//! and moves suspicion towards the past. For each suspect commit the file is
//! compared with every parent's version: lines that survive unchanged into a
//! parent are handed to that parent, whatever is left belongs to the suspect.
//! A parent holding an identical blob takes all remaining lines at once.

use crate::areas::database::Database;
use crate::artifacts::core::AbortSignal;
use crate::artifacts::diff::hunks::split_lines;
use crate::artifacts::diff::myers::{Edit, MyersDiff};
use crate::artifacts::log::rev_list::CommitNode;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::tree::resolver;
use crate::errors::{Error, Result};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlameLine {
    /// 1-based line number in the blamed version
    pub line_number: usize,
    pub commit: ObjectId,
    pub content: String,
}

/// Consecutive lines attributed to the same commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlameHunk {
    pub commit: ObjectId,
    pub start_line: usize,
    pub lines: Vec<BlameLine>,
}

/// Lines still looking for their origin, as (final index, index in this version)
type Tracked = Vec<(usize, usize)>;

struct Suspect {
    node: CommitNode,
    blob: ObjectId,
    lines: Tracked,
}

/// Lines handed to one parent
struct Handoff {
    parent: CommitNode,
    blob: ObjectId,
    lines: Tracked,
}

pub fn blame(
    database: &Database,
    start: ObjectId,
    path: &str,
    abort: Option<&AbortSignal>,
) -> Result<Vec<BlameLine>> {
    let start_node = CommitNode::load(database, start)?;
    let entry = resolver::resolve_path(database, start_node.commit.tree_oid(), path)?;
    if !entry.mode.is_blob() {
        return Err(Error::PathNotFound(path.to_string()));
    }

    let content = read_text(database, &entry.oid, &start)?;
    let final_lines = split_lines(&content)
        .into_iter()
        .map(|line| line.text.to_string())
        .collect::<Vec<_>>();
    let mut attribution: Vec<Option<ObjectId>> = vec![None; final_lines.len()];

    let mut queue = BinaryHeap::new();
    let mut pending: HashMap<ObjectId, Suspect> = HashMap::new();
    let mut sequence = 0u64;

    queue.push((
        start_node.commit.timestamp().timestamp(),
        Reverse(sequence),
        start,
    ));
    pending.insert(
        start,
        Suspect {
            node: start_node,
            blob: entry.oid,
            lines: (0..final_lines.len()).map(|i| (i, i)).collect(),
        },
    );

    while let Some((timestamp, _, oid)) = queue.pop() {
        if let Some(abort) = abort {
            abort.check()?;
        }
        let Some(suspect) = pending.remove(&oid) else {
            continue;
        };

        let (handoffs, kept) = pass_to_parents(database, suspect, path)?;
        for (final_index, _) in kept {
            attribution[final_index] = Some(oid);
        }

        for handoff in handoffs {
            let parent_oid = handoff.parent.oid;
            match pending.get_mut(&parent_oid) {
                Some(existing) => existing.lines.extend(handoff.lines),
                None => {
                    sequence += 1;
                    let parent_time = handoff.parent.commit.timestamp().timestamp();
                    queue.push((parent_time.min(timestamp), Reverse(sequence), parent_oid));
                    pending.insert(
                        parent_oid,
                        Suspect {
                            node: handoff.parent,
                            blob: handoff.blob,
                            lines: handoff.lines,
                        },
                    );
                }
            }
        }
    }

    let lines = final_lines
        .into_iter()
        .zip(attribution)
        .enumerate()
        .map(|(index, (content, commit))| {
            let commit = commit.ok_or_else(|| {
                let line_number = index + 1;
                Error::CorruptRepository(format!("no origin for line {line_number} of {path}"))
            })?;
            Ok(BlameLine {
                line_number: index + 1,
                commit,
                content,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(%path, %start, lines = lines.len(), "blamed file");
    Ok(lines)
}

/// Hand the suspect's lines to its parents; returns what each parent takes
/// and the lines that stay with the suspect
fn pass_to_parents(
    database: &Database,
    suspect: Suspect,
    path: &str,
) -> Result<(Vec<Handoff>, Tracked)> {
    let mut remaining = suspect.lines;
    let mut handoffs = Vec::new();
    let mut current_lines: Option<Vec<String>> = None;

    for parent in suspect.node.parents(database)? {
        if remaining.is_empty() {
            break;
        }

        let Some(entry) = resolver::find_entry(database, parent.commit.tree_oid(), path)
            .map_err(|e| e.referenced_by(&parent.oid))?
            .filter(|entry| entry.mode.is_blob())
        else {
            continue;
        };

        if entry.oid == suspect.blob {
            handoffs.push(Handoff {
                parent,
                blob: entry.oid,
                lines: std::mem::take(&mut remaining),
            });
            break;
        }

        if current_lines.is_none() {
            current_lines = Some(lines_of(database, &suspect.blob, &suspect.node.oid)?);
        }
        let current = current_lines.as_deref().unwrap_or_default();
        let previous = lines_of(database, &entry.oid, &parent.oid)?;

        // position in this version -> position in the parent's version
        let unchanged: HashMap<usize, usize> = MyersDiff::new(&previous, current)
            .diff()
            .into_iter()
            .filter_map(|edit| match edit {
                Edit::Equal { old, new } => Some((new, old)),
                _ => None,
            })
            .collect();

        let (passed, kept): (Tracked, Tracked) = remaining
            .into_iter()
            .partition(|(_, local)| unchanged.contains_key(local));
        remaining = kept;

        if !passed.is_empty() {
            handoffs.push(Handoff {
                parent,
                blob: entry.oid,
                lines: passed
                    .into_iter()
                    .map(|(final_index, local)| (final_index, unchanged[&local]))
                    .collect(),
            });
        }
    }

    Ok((handoffs, remaining))
}

fn read_text(database: &Database, blob: &ObjectId, commit: &ObjectId) -> Result<String> {
    let blob = database
        .parse_object_as_blob(blob)
        .map_err(|e| e.referenced_by(commit))?;
    Ok(String::from_utf8_lossy(blob.content()).into_owned())
}

fn lines_of(database: &Database, blob: &ObjectId, commit: &ObjectId) -> Result<Vec<String>> {
    let text = read_text(database, blob, commit)?;
    Ok(split_lines(&text)
        .into_iter()
        .map(|line| line.text.to_string())
        .collect())
}

/// Group consecutive lines that share a commit
pub fn blame_hunks(lines: &[BlameLine]) -> Vec<BlameHunk> {
    let mut hunks: Vec<BlameHunk> = Vec::new();

    for line in lines {
        match hunks.last_mut() {
            Some(hunk) if hunk.commit == line.commit => hunk.lines.push(line.clone()),
            _ => hunks.push(BlameHunk {
                commit: line.commit,
                start_line: line.line_number,
                lines: vec![line.clone()],
            }),
        }
    }

    hunks
}
