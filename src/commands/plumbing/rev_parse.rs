use crate::areas::repository::Repository;
use std::io::Write;

impl Repository {
    /// Print the object id of each revision; with `split`, print the
    /// revision and path parts of a `revision/path` string instead
    pub fn rev_parse(&self, revisions: &[String], split: bool) -> anyhow::Result<()> {
        for revision in revisions {
            if split {
                let (revision, path) = self.split_commitish_path(revision)?;
                writeln!(self.writer(), "{revision}\t{path}")?;
            } else {
                writeln!(self.writer(), "{}", self.resolve(revision)?)?;
            }
        }

        Ok(())
    }
}
