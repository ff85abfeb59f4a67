use crate::artifacts::diff::hunks::{self, DiffHunk};

/// Line-level comparison of two blob contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobDiff {
    Text(Vec<DiffHunk>),
    /// At least one side is not text; no line diff was attempted
    Binary,
}

impl BlobDiff {
    pub fn is_binary(&self) -> bool {
        matches!(self, BlobDiff::Binary)
    }

    pub fn hunks(&self) -> &[DiffHunk] {
        match self {
            BlobDiff::Text(hunks) => hunks,
            BlobDiff::Binary => &[],
        }
    }

    /// Added and removed line counts
    pub fn line_stats(&self) -> (usize, usize) {
        self.hunks().iter().fold((0, 0), |(added, removed), hunk| {
            (added + hunk.additions(), removed + hunk.deletions())
        })
    }
}

/// Content that has a NUL byte within its first `sniff_len` bytes, or that is
/// not valid UTF-8, is treated as binary
pub fn as_text(content: &[u8], sniff_len: usize) -> Option<&str> {
    let sniffed = &content[..content.len().min(sniff_len)];
    if sniffed.contains(&0) {
        return None;
    }
    std::str::from_utf8(content).ok()
}

pub fn diff_blobs(old: &[u8], new: &[u8], context_lines: usize, sniff_len: usize) -> BlobDiff {
    if old == new {
        return BlobDiff::Text(Vec::new());
    }

    match (as_text(old, sniff_len), as_text(new, sniff_len)) {
        (Some(old), Some(new)) => BlobDiff::Text(hunks::diff_lines(old, new, context_lines)),
        _ => BlobDiff::Binary,
    }
}
