use crate::areas::repository::Repository;
use crate::artifacts::blame::blame_hunks;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use colored::Colorize;
use std::collections::HashMap;
use std::io::Write;

impl Repository {
    /// Blame `commitish`, a `revision/path` string (or a path on the default
    /// branch)
    pub fn blame_file(&self, commitish: &str) -> anyhow::Result<()> {
        let (revision, path) = self.split_commitish_path(commitish)?;
        if path.is_empty() {
            anyhow::bail!("'{commitish}' does not name a file");
        }
        let commit = self.resolve(&revision)?;

        let lines = self.blame(commit, &path, None)?;
        let width = lines.len().to_string().len();
        let mut commits: HashMap<ObjectId, Commit> = HashMap::new();

        for hunk in blame_hunks(&lines) {
            if !commits.contains_key(&hunk.commit) {
                let parsed = self.database().parse_object_as_commit(&hunk.commit)?;
                commits.insert(hunk.commit, parsed);
            }
            let Some(origin) = commits.get(&hunk.commit) else {
                continue;
            };
            let author = origin.author();
            let date = author.timestamp().format("%Y-%m-%d %H:%M:%S %z");

            for line in &hunk.lines {
                writeln!(
                    self.writer(),
                    "{} ({} {} {:>width$}) {}",
                    hunk.commit.to_short_oid().yellow(),
                    author.name(),
                    date,
                    line.line_number,
                    line.content
                )?;
            }
        }

        Ok(())
    }
}
