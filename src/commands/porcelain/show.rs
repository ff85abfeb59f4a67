use crate::areas::repository::Repository;
use crate::artifacts::log::rev_list::CommitNode;
use crate::commands::porcelain::diff::DiffCommandOptions;
use std::io::Write;

impl Repository {
    /// Print a commit followed by the patch it introduced
    pub fn show(&self, revision: &str, opts: &DiffCommandOptions) -> anyhow::Result<()> {
        let oid = self.resolve(revision)?;
        let node = CommitNode::load(self.database(), oid)?;

        self.show_commit_medium(&node, false, &self.decorations()?)?;

        let options = self.diff_command_options(opts)?;
        let patches = self.diff_commit(&oid, &options)?;
        if patches.is_empty() {
            return Ok(());
        }

        writeln!(self.writer())?;
        if opts.name_status {
            let changes = patches.into_iter().map(|patch| patch.diff).collect::<Vec<_>>();
            return self.print_name_status(&changes);
        }
        for patch in &patches {
            self.print_file_patch(patch)?;
        }

        Ok(())
    }
}
