use crate::areas::repository::Repository;
use crate::artifacts::diff::FilePatch;
use crate::artifacts::diff::blob_diff::BlobDiff;
use crate::artifacts::diff::hunks::{DiffHunk, DiffLineKind};
use crate::artifacts::diff::tree_diff::{DiffFilter, DiffOptions, FileDiff, FileStatus};
use crate::artifacts::objects::tree::TreeEntry;
use colored::Colorize;
use std::io::Write;

/// Placeholder id for the missing side of an added or deleted file
const NULL_SHORT_OID: &str = "0000000";

#[derive(Debug, Clone, Default)]
pub struct DiffCommandOptions {
    pub paths: Vec<String>,
    pub name_status: bool,
    /// `git diff --diff-filter` letters (`AMD`, `R`, ...)
    pub filter: Option<String>,
    pub no_renames: bool,
}

impl Repository {
    pub fn diff(&self, old: &str, new: &str, opts: &DiffCommandOptions) -> anyhow::Result<()> {
        let old_tree = self.commit_tree(&self.resolve(old)?)?;
        let new_tree = self.commit_tree(&self.resolve(new)?)?;
        let options = self.diff_command_options(opts)?;

        let changes = self.diff_trees(Some(&old_tree), Some(&new_tree), &options)?;
        if opts.name_status {
            return self.print_name_status(&changes);
        }

        for diff in changes {
            let content = self.diff_entries(diff.old.as_ref(), diff.new.as_ref())?;
            self.print_file_patch(&FilePatch { diff, content })?;
        }

        Ok(())
    }

    pub(crate) fn diff_command_options(
        &self,
        opts: &DiffCommandOptions,
    ) -> anyhow::Result<DiffOptions> {
        let mut options = self.diff_options(&opts.paths);
        options.detect_renames = !opts.no_renames;
        if let Some(filter) = &opts.filter {
            options.filter = DiffFilter::try_parse(filter)
                .ok_or_else(|| anyhow::anyhow!("invalid diff filter '{filter}'"))?;
        }

        Ok(options)
    }

    pub(crate) fn print_name_status(&self, changes: &[FileDiff]) -> anyhow::Result<()> {
        for change in changes {
            match &change.status {
                FileStatus::Renamed { from, similarity } => writeln!(
                    self.writer(),
                    "R{similarity:03}\t{from}\t{}",
                    change.path
                )?,
                _ => writeln!(self.writer(), "{}\t{}", change.status_char(), change.path)?,
            }
        }

        Ok(())
    }

    pub(crate) fn print_file_patch(&self, patch: &FilePatch) -> anyhow::Result<()> {
        let diff = &patch.diff;
        let a_path = format!("a/{}", diff.old_path());
        let b_path = format!("b/{}", diff.path);

        writeln!(
            self.writer(),
            "{}",
            format!("diff --git {a_path} {b_path}").bold()
        )?;
        self.print_diff_mode(diff)?;

        let (Some(old), Some(new)) = (&diff.old, &diff.new) else {
            return self.print_diff_content(patch, &a_path, &b_path);
        };
        if old.oid == new.oid {
            return Ok(());
        }

        self.print_diff_content(patch, &a_path, &b_path)
    }

    fn print_diff_mode(&self, diff: &FileDiff) -> anyhow::Result<()> {
        match (&diff.old, &diff.new) {
            (None, Some(new)) => {
                writeln!(
                    self.writer(),
                    "{}",
                    format!("new file mode {}", new.mode.as_str()).bold()
                )?;
            }
            (Some(old), None) => {
                writeln!(
                    self.writer(),
                    "{}",
                    format!("deleted file mode {}", old.mode.as_str()).bold()
                )?;
            }
            (Some(old), Some(new)) => {
                if old.mode != new.mode {
                    writeln!(
                        self.writer(),
                        "{}",
                        format!("old mode {}", old.mode.as_str()).bold()
                    )?;
                    writeln!(
                        self.writer(),
                        "{}",
                        format!("new mode {}", new.mode.as_str()).bold()
                    )?;
                }
                if let FileStatus::Renamed { from, similarity } = &diff.status {
                    writeln!(
                        self.writer(),
                        "{}",
                        format!("similarity index {similarity}%").bold()
                    )?;
                    writeln!(self.writer(), "{}", format!("rename from {from}").bold())?;
                    writeln!(
                        self.writer(),
                        "{}",
                        format!("rename to {}", diff.path).bold()
                    )?;
                }
            }
            (None, None) => {}
        }

        Ok(())
    }

    fn print_diff_content(&self, patch: &FilePatch, a_path: &str, b_path: &str) -> anyhow::Result<()> {
        let diff = &patch.diff;
        let short = |entry: &Option<TreeEntry>| {
            entry
                .as_ref()
                .map(|entry| entry.oid.to_short_oid())
                .unwrap_or_else(|| NULL_SHORT_OID.to_string())
        };

        let mut oid_range = format!("index {}..{}", short(&diff.old), short(&diff.new));
        if let (Some(old), Some(new)) = (&diff.old, &diff.new)
            && old.mode == new.mode
        {
            oid_range.push_str(&format!(" {}", old.mode.as_str()));
        }
        writeln!(self.writer(), "{}", oid_range.bold())?;

        let a_path = if diff.old.is_some() { a_path } else { "/dev/null" };
        let b_path = if diff.new.is_some() { b_path } else { "/dev/null" };

        match &patch.content {
            BlobDiff::Binary => {
                writeln!(self.writer(), "Binary files {a_path} and {b_path} differ")?;
            }
            BlobDiff::Text(hunks) => {
                writeln!(self.writer(), "{}", format!("--- {a_path}").bold())?;
                writeln!(self.writer(), "{}", format!("+++ {b_path}").bold())?;
                for hunk in hunks {
                    self.print_diff_hunk(hunk)?;
                }
            }
        }

        Ok(())
    }

    fn print_diff_hunk(&self, hunk: &DiffHunk) -> anyhow::Result<()> {
        writeln!(self.writer(), "{}", hunk.header().cyan())?;

        for line in &hunk.lines {
            let text = format!("{}{}", line.kind.marker(), line.text);
            match line.kind {
                DiffLineKind::Context => writeln!(self.writer(), "{text}")?,
                DiffLineKind::Added => writeln!(self.writer(), "{}", text.green())?,
                DiffLineKind::Removed => writeln!(self.writer(), "{}", text.red())?,
            }
            if !line.has_newline {
                writeln!(self.writer(), "\\ No newline at end of file")?;
            }
        }

        Ok(())
    }
}
