use crate::areas::repository::Repository;
use colored::Colorize;
use std::io::Write;

impl Repository {
    /// Print lines matching `pattern` in the tree of `revision`, with context;
    /// `page` selects one page of `search_per_page` matches
    pub fn grep(&self, pattern: &str, revision: &str, page: Option<usize>) -> anyhow::Result<()> {
        let commit = self.resolve(revision)?;
        let mut matches = self.search_tree(commit, pattern, None)?;
        if let Some(page) = page {
            let per_page = self.settings().search_per_page;
            matches = matches.into_iter().skip(page * per_page).take(per_page).collect();
        }

        for (position, found) in matches.iter().enumerate() {
            if position > 0 {
                writeln!(self.writer(), "{}", "--".cyan())?;
            }

            let first = found.line_number - found.context_before.len();
            for (offset, line) in found.context_before.iter().enumerate() {
                writeln!(self.writer(), "{}-{}-{line}", found.path.magenta(), first + offset)?;
            }
            writeln!(
                self.writer(),
                "{}:{}:{}",
                found.path.magenta(),
                found.line_number.to_string().green(),
                found.line
            )?;
            for (offset, line) in found.context_after.iter().enumerate() {
                writeln!(
                    self.writer(),
                    "{}-{}-{line}",
                    found.path.magenta(),
                    found.line_number + 1 + offset
                )?;
            }
        }

        Ok(())
    }
}
