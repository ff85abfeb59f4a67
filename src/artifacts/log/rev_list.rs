use crate::areas::database::Database;
use crate::artifacts::core::AbortSignal;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::tree::resolver;
use crate::errors::Result;
use derive_new::new;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};

/// A commit together with its id; parents are loaded on demand
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct CommitNode {
    pub oid: ObjectId,
    pub commit: Commit,
}

impl CommitNode {
    pub fn load(database: &Database, oid: ObjectId) -> Result<Self> {
        let commit = database.parse_object_as_commit(&oid)?;
        Ok(CommitNode { oid, commit })
    }

    /// Parent nodes in parent order
    pub fn parents(&self, database: &Database) -> Result<Vec<CommitNode>> {
        self.commit
            .parents()
            .iter()
            .map(|parent| {
                CommitNode::load(database, *parent).map_err(|e| e.referenced_by(&self.oid))
            })
            .collect()
    }

    /// First parent, the mainline history
    pub fn first_parent(&self, database: &Database) -> Result<Option<CommitNode>> {
        self.commit
            .parent()
            .map(|parent| {
                CommitNode::load(database, *parent).map_err(|e| e.referenced_by(&self.oid))
            })
            .transpose()
    }
}

/// Filters and pagination for a history walk
#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    /// Only commits that change what lives at this path
    pub path: Option<String>,
    /// Only commits whose message contains this text, ignoring case
    pub message: Option<String>,
    pub skip: usize,
    pub limit: Option<usize>,
    pub abort: Option<AbortSignal>,
}

impl HistoryQuery {
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into()).filter(|path: &String| !path.is_empty());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into().to_lowercase());
        self
    }

    pub fn page(mut self, skip: usize, limit: usize) -> Self {
        self.skip = skip;
        self.limit = Some(limit);
        self
    }

    pub fn with_abort(mut self, abort: AbortSignal) -> Self {
        self.abort = Some(abort);
        self
    }
}

struct QueuedCommit {
    /// Committer time, clamped so it never exceeds the time of the child
    /// that queued it
    timestamp: i64,
    sequence: Reverse<u64>,
    node: CommitNode,
}

impl QueuedCommit {
    fn key(&self) -> (i64, Reverse<u64>) {
        (self.timestamp, self.sequence)
    }
}

impl PartialEq for QueuedCommit {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for QueuedCommit {}

impl PartialOrd for QueuedCommit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedCommit {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Lazy walk over the ancestry of a commit, newest first
///
/// Commits come out of a max-heap keyed by committer time. Parents are queued
/// in parent order when their child is taken, so ties resolve first parent
/// first. A parent's key is clamped to its child's, which keeps children ahead
/// of their ancestors even when clocks are skewed. The walk stops at the first
/// error and never skips an unreadable commit.
pub struct RevList<'r> {
    database: &'r Database,
    queue: BinaryHeap<QueuedCommit>,
    seen: HashSet<ObjectId>,
    sequence: u64,
    query: HistoryQuery,
    skipped: usize,
    yielded: usize,
    finished: bool,
}

impl<'r> RevList<'r> {
    pub fn new(database: &'r Database, start: ObjectId, query: HistoryQuery) -> Result<Self> {
        let node = CommitNode::load(database, start)?;

        let mut rev_list = RevList {
            database,
            queue: BinaryHeap::new(),
            seen: HashSet::from([start]),
            sequence: 0,
            query,
            skipped: 0,
            yielded: 0,
            finished: false,
        };
        let timestamp = node.commit.timestamp().timestamp();
        rev_list.push(node, timestamp);

        Ok(rev_list)
    }

    /// Number of matching commits; walks the whole reachable history
    pub fn total(mut self) -> Result<usize> {
        self.try_fold(0, |count, node| node.map(|_| count + 1))
    }

    fn push(&mut self, node: CommitNode, timestamp: i64) {
        self.queue.push(QueuedCommit {
            timestamp,
            sequence: Reverse(self.sequence),
            node,
        });
        self.sequence += 1;
    }

    fn enqueue_parents(&mut self, child: &QueuedCommit) -> Result<()> {
        for parent in child.node.commit.parents() {
            if !self.seen.insert(*parent) {
                continue;
            }

            let node = CommitNode::load(self.database, *parent)
                .map_err(|e| e.referenced_by(&child.node.oid))?;
            let timestamp = node.commit.timestamp().timestamp().min(child.timestamp);
            self.push(node, timestamp);
        }

        Ok(())
    }

    fn matches(&self, node: &CommitNode) -> Result<bool> {
        if let Some(needle) = &self.query.message
            && !node.commit.message().to_lowercase().contains(needle.as_str())
        {
            return Ok(false);
        }

        match &self.query.path {
            Some(path) => touches_path(self.database, node, path),
            None => Ok(true),
        }
    }

    fn advance(&mut self) -> Result<Option<CommitNode>> {
        loop {
            if let Some(limit) = self.query.limit
                && self.yielded >= limit
            {
                return Ok(None);
            }
            if let Some(abort) = &self.query.abort {
                abort.check()?;
            }

            let Some(queued) = self.queue.pop() else {
                return Ok(None);
            };
            self.enqueue_parents(&queued)?;

            if !self.matches(&queued.node)? {
                continue;
            }
            if self.skipped < self.query.skip {
                self.skipped += 1;
                continue;
            }

            self.yielded += 1;
            return Ok(Some(queued.node));
        }
    }
}

impl Iterator for RevList<'_> {
    type Item = Result<CommitNode>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let next = self.advance().transpose();
        if !matches!(next, Some(Ok(_))) {
            self.finished = true;
        }
        next
    }
}

/// Whether the commit changes the entry at `path` relative to its first
/// parent; a root commit touches every path that exists in it
pub fn touches_path(database: &Database, node: &CommitNode, path: &str) -> Result<bool> {
    let here = resolver::find_entry(database, node.commit.tree_oid(), path)
        .map_err(|e| e.referenced_by(&node.oid))?;

    let Some(parent) = node.first_parent(database)? else {
        return Ok(here.is_some());
    };
    let there = resolver::find_entry(database, parent.commit.tree_oid(), path)
        .map_err(|e| e.referenced_by(&parent.oid))?;

    Ok(match (here, there) {
        (None, None) => false,
        (Some(here), Some(there)) => here.oid != there.oid || here.mode != there.mode,
        _ => true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::objects::commit::Author;
    use pretty_assertions::assert_eq;

    fn queued(timestamp: i64, sequence: u64) -> QueuedCommit {
        let author = Author::try_from("A <a@example.com> 0 +0000").unwrap();
        let commit = Commit::new(
            vec![],
            ObjectId::default(),
            author.clone(),
            author,
            String::from("m\n"),
        );
        QueuedCommit {
            timestamp,
            sequence: Reverse(sequence),
            node: CommitNode::new(ObjectId::default(), commit),
        }
    }

    #[test]
    fn newest_commit_is_taken_first() {
        let mut heap = BinaryHeap::from([queued(10, 0), queued(30, 1), queued(20, 2)]);
        let order = std::iter::from_fn(|| heap.pop().map(|q| q.timestamp)).collect::<Vec<_>>();
        assert_eq!(order, vec![30, 20, 10]);
    }

    #[test]
    fn equal_timestamps_keep_queue_order() {
        let mut heap = BinaryHeap::from([queued(5, 2), queued(5, 0), queued(5, 1)]);
        let order = std::iter::from_fn(|| heap.pop().map(|q| q.sequence.0)).collect::<Vec<_>>();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn query_builders_normalise_filters() {
        let query = HistoryQuery::default()
            .with_path("")
            .with_message("Fix")
            .page(10, 5);

        assert_eq!(query.path, None);
        assert_eq!(query.message.as_deref(), Some("fix"));
        assert_eq!((query.skip, query.limit), (10, Some(5)));
    }
}
