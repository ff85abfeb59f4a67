use crate::areas::repository::Repository;
use colored::Colorize;
use std::io::Write;

/// Extensions listed before the rest is summarised
const TOP_EXTENSIONS: usize = 10;

impl Repository {
    pub fn print_stats(&self, revision: &str) -> anyhow::Result<()> {
        let commit = self.resolve(revision)?;
        let stats = self.stats(commit, None)?;

        writeln!(self.writer(), "{}", "Files".bold())?;
        writeln!(self.writer(), "  {} files, {}", stats.files, human_size(stats.size))?;
        for (extension, count) in stats.extensions.iter().take(TOP_EXTENSIONS) {
            writeln!(self.writer(), "  {count:>6}  {extension}")?;
        }
        let rest = stats.extensions.len().saturating_sub(TOP_EXTENSIONS);
        if rest > 0 {
            writeln!(self.writer(), "  ... and {rest} more")?;
        }

        writeln!(self.writer())?;
        writeln!(self.writer(), "{}", "Authors".bold())?;
        for author in &stats.authors {
            writeln!(
                self.writer(),
                "  {:>6}  {} <{}>",
                author.commits,
                author.name,
                author.email
            )?;
        }

        Ok(())
    }
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}
