use crate::areas::repository::Repository;
use crate::artifacts::archive::ArchiveFormat;
use anyhow::Context;
use std::io::Write;
use std::path::Path;

impl Repository {
    /// Write an archive of `revision` to `output`, or to the writer when no
    /// output file is given
    pub fn archive(
        &self,
        revision: &str,
        format: ArchiveFormat,
        prefix: Option<&str>,
        output: Option<&Path>,
    ) -> anyhow::Result<()> {
        let commit = self.resolve(revision)?;
        let bytes = self.archive_tree(commit, format, prefix)?;

        match output {
            Some(output) => std::fs::write(output, &bytes)
                .with_context(|| format!("failed to write archive to {}", output.display()))?,
            None => self.writer().write_all(&bytes)?,
        }

        Ok(())
    }
}
