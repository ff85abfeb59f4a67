use crate::CommitDisplayFormat;
use crate::areas::repository::Repository;
use crate::artifacts::log::rev_list::{CommitNode, HistoryQuery};
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::Error;
use colored::Colorize;
use std::collections::HashMap;
use std::io::Write;

#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub revision: Option<String>,
    pub path: Option<String>,
    /// Only commits whose message contains this text
    pub grep: Option<String>,
    pub skip: usize,
    pub max_count: Option<usize>,
    /// Zero-based page of `commits_per_page` commits; overrides skip and max count
    pub page: Option<usize>,
    pub oneline: bool,
    pub abbrev_commit: bool,
    pub format: CommitDisplayFormat,
    pub decorate: bool,
    /// Print only the number of matching commits
    pub count: bool,
}

/// Branch and tag names pointing at each commit
pub type Decorations = HashMap<ObjectId, Vec<String>>;

impl Repository {
    pub fn log(&self, opts: &LogOptions) -> anyhow::Result<()> {
        let start = match &opts.revision {
            Some(revision) => self.resolve(revision)?,
            None => self
                .refs()
                .read_head()?
                .ok_or_else(|| anyhow::anyhow!("HEAD does not point at any commit yet"))?,
        };

        if opts.count {
            let total = self.count_history(start, opts.path.as_deref(), None)?;
            writeln!(self.writer(), "{total}")?;
            return Ok(());
        }

        let mut query = HistoryQuery {
            skip: opts.skip,
            limit: opts.max_count,
            ..HistoryQuery::default()
        };
        if let Some(page) = opts.page {
            let per_page = self.settings().commits_per_page;
            query = query.page(page * per_page, per_page);
        }
        if let Some(path) = &opts.path {
            query = query.with_path(path.as_str());
        }
        if let Some(grep) = &opts.grep {
            query = query.with_message(grep.as_str());
        }

        let decorations = if opts.decorate {
            self.decorations()?
        } else {
            Decorations::new()
        };

        let oneline = opts.oneline || opts.format == CommitDisplayFormat::OneLine;
        for (position, node) in self.walk_history(start, query)?.enumerate() {
            let node = node?;
            if oneline {
                self.show_commit_oneline(&node, opts.abbrev_commit || opts.oneline, &decorations)?;
            } else {
                if position > 0 {
                    writeln!(self.writer())?;
                }
                self.show_commit_medium(&node, opts.abbrev_commit, &decorations)?;
            }
        }

        Ok(())
    }

    pub(crate) fn decorations(&self) -> anyhow::Result<Decorations> {
        let mut decorations = Decorations::new();

        for branch in self.list_branches()? {
            decorations
                .entry(branch.oid)
                .or_default()
                .push(branch.name.green().to_string());
        }
        for tag in self.list_tags()? {
            // annotated tags decorate the commit they point at
            let oid = match self.resolve(&format!("refs/tags/{}", tag.name)) {
                Ok(oid) => oid,
                Err(Error::RevisionNotFound(_)) => {
                    tracing::debug!(tag = %tag.name, target = %tag.oid, "tag does not peel to a commit");
                    tag.oid
                }
                Err(e) => return Err(e.into()),
            };
            decorations
                .entry(oid)
                .or_default()
                .push(format!("tag: {}", tag.name).yellow().to_string());
        }

        Ok(decorations)
    }

    pub(crate) fn show_commit_medium(
        &self,
        node: &CommitNode,
        abbrev_commit: bool,
        decorations: &Decorations,
    ) -> anyhow::Result<()> {
        let commit = &node.commit;

        writeln!(
            self.writer(),
            "{}{}",
            format!("commit {}", abbrev_commit_id(&node.oid, abbrev_commit)).yellow(),
            commit_decoration(&node.oid, decorations)
        )?;
        if commit.is_merge() {
            let parents = commit
                .parents()
                .iter()
                .map(ObjectId::to_short_oid)
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(self.writer(), "Merge: {parents}")?;
        }
        writeln!(self.writer(), "Author: {}", commit.author().display_name())?;
        writeln!(
            self.writer(),
            "Date:   {}",
            commit.author().readable_timestamp()
        )?;
        writeln!(self.writer())?;
        for message_line in commit.message().lines() {
            writeln!(self.writer(), "    {}", message_line)?;
        }

        Ok(())
    }

    fn show_commit_oneline(
        &self,
        node: &CommitNode,
        abbrev_commit: bool,
        decorations: &Decorations,
    ) -> anyhow::Result<()> {
        writeln!(
            self.writer(),
            "{}{} {}",
            abbrev_commit_id(&node.oid, abbrev_commit).yellow(),
            commit_decoration(&node.oid, decorations),
            node.commit.short_message()
        )?;

        Ok(())
    }
}

fn abbrev_commit_id(oid: &ObjectId, abbrev_commit: bool) -> String {
    if abbrev_commit {
        oid.to_short_oid()
    } else {
        oid.to_hex()
    }
}

fn commit_decoration(oid: &ObjectId, decorations: &Decorations) -> String {
    match decorations.get(oid) {
        Some(names) => format!(" ({})", names.join(", ")),
        None => String::new(),
    }
}
