use crate::areas::refs::Reference;
use crate::areas::repository::Repository;
use colored::Colorize;
use std::io::Write;

impl Repository {
    /// List branches, marking the one HEAD points at
    pub fn branch(&self, verbose: bool) -> anyhow::Result<()> {
        let current = self.default_branch()?;

        for branch in self.list_branches()? {
            let is_current = current.as_deref() == Some(branch.name.as_str());
            let name = if is_current {
                format!("* {}", branch.name.green())
            } else {
                format!("  {}", branch.name)
            };
            self.print_reference(&name, &branch, verbose)?;
        }

        Ok(())
    }

    pub fn tag(&self, verbose: bool) -> anyhow::Result<()> {
        for tag in self.list_tags()? {
            self.print_reference(&tag.name, &tag, verbose)?;
        }

        Ok(())
    }

    fn print_reference(&self, label: &str, reference: &Reference, verbose: bool) -> anyhow::Result<()> {
        if !verbose {
            writeln!(self.writer(), "{label}")?;
            return Ok(());
        }

        let commit = self.resolve(&reference.oid.to_hex())?;
        let summary = self
            .database()
            .parse_object_as_commit(&commit)?
            .short_message();
        writeln!(
            self.writer(),
            "{label} {} {summary}",
            commit.to_short_oid().yellow()
        )?;

        Ok(())
    }
}
