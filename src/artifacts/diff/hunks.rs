use crate::artifacts::diff::myers::{Edit, MyersDiff};

/// A line of text and whether it ended with a newline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Line<'t> {
    pub text: &'t str,
    pub has_newline: bool,
}

/// Split text into lines; only the last line may lack its newline
pub fn split_lines(text: &str) -> Vec<Line<'_>> {
    text.split_inclusive('\n')
        .map(|raw| match raw.strip_suffix('\n') {
            Some(text) => Line {
                text,
                has_newline: true,
            },
            None => Line {
                text: raw,
                has_newline: false,
            },
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffLineKind {
    Context,
    Added,
    Removed,
}

impl DiffLineKind {
    pub fn marker(&self) -> char {
        match self {
            DiffLineKind::Context => ' ',
            DiffLineKind::Added => '+',
            DiffLineKind::Removed => '-',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub kind: DiffLineKind,
    pub text: String,
    pub has_newline: bool,
}

/// A run of changes with its surrounding context
///
/// Line numbers are 1-based. An empty range starts at the line before it, as
/// in unified diffs (`-0,0` for an insertion at the top of a file).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffHunk {
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
    pub lines: Vec<DiffLine>,
}

impl DiffHunk {
    pub fn header(&self) -> String {
        format!(
            "@@ -{},{} +{},{} @@",
            self.old_start, self.old_count, self.new_start, self.new_count
        )
    }

    pub fn additions(&self) -> usize {
        self.count(DiffLineKind::Added)
    }

    pub fn deletions(&self) -> usize {
        self.count(DiffLineKind::Removed)
    }

    fn count(&self, kind: DiffLineKind) -> usize {
        self.lines.iter().filter(|line| line.kind == kind).count()
    }

    /// Zero-based index of the first old line the hunk covers
    fn old_offset(&self) -> usize {
        if self.old_count == 0 {
            self.old_start
        } else {
            self.old_start - 1
        }
    }
}

/// Line diff of two texts grouped into hunks with `context` lines around
/// every change
pub fn diff_lines(old: &str, new: &str, context: usize) -> Vec<DiffHunk> {
    let a = split_lines(old);
    let b = split_lines(new);
    let edits = MyersDiff::new(&a, &b).diff();

    group_hunks(&edits, &a, &b, context)
}

fn group_hunks(edits: &[Edit], a: &[Line], b: &[Line], context: usize) -> Vec<DiffHunk> {
    // (old, new) positions before each edit
    let mut positions = Vec::with_capacity(edits.len() + 1);
    let (mut old, mut new) = (0, 0);
    for edit in edits {
        positions.push((old, new));
        match edit {
            Edit::Delete { .. } => old += 1,
            Edit::Insert { .. } => new += 1,
            Edit::Equal { .. } => {
                old += 1;
                new += 1;
            }
        }
    }
    positions.push((old, new));

    let next_change = |from: usize| (from..edits.len()).find(|&i| !edits[i].is_equal());

    let mut hunks = Vec::new();
    let mut cursor = 0;
    while let Some(first) = next_change(cursor) {
        let start = first.saturating_sub(context).max(cursor);

        let mut last = first;
        while let Some(next) = next_change(last + 1) {
            if next - last - 1 > 2 * context {
                break;
            }
            last = next;
        }
        let end = (last + context + 1).min(edits.len());

        hunks.push(build_hunk(&edits[start..end], positions[start], a, b));
        cursor = end;
    }

    hunks
}

fn build_hunk(edits: &[Edit], (old_offset, new_offset): (usize, usize), a: &[Line], b: &[Line]) -> DiffHunk {
    let to_line = |kind, line: &Line| DiffLine {
        kind,
        text: line.text.to_string(),
        has_newline: line.has_newline,
    };

    let lines = edits
        .iter()
        .map(|edit| match *edit {
            Edit::Delete { old } => to_line(DiffLineKind::Removed, &a[old]),
            Edit::Insert { new } => to_line(DiffLineKind::Added, &b[new]),
            Edit::Equal { old, .. } => to_line(DiffLineKind::Context, &a[old]),
        })
        .collect::<Vec<_>>();

    let old_count = lines
        .iter()
        .filter(|line| line.kind != DiffLineKind::Added)
        .count();
    let new_count = lines
        .iter()
        .filter(|line| line.kind != DiffLineKind::Removed)
        .count();

    DiffHunk {
        old_start: if old_count == 0 { old_offset } else { old_offset + 1 },
        old_count,
        new_start: if new_count == 0 { new_offset } else { new_offset + 1 },
        new_count,
        lines,
    }
}

/// Apply hunks produced from `old` back onto it
///
/// Returns `None` when a context or removed line does not match `old`.
pub fn apply_hunks(old: &str, hunks: &[DiffHunk]) -> Option<String> {
    let old_lines = split_lines(old);
    let mut output = String::with_capacity(old.len());
    let mut cursor = 0;

    let push = |output: &mut String, text: &str, has_newline: bool| {
        output.push_str(text);
        if has_newline {
            output.push('\n');
        }
    };

    for hunk in hunks {
        let offset = hunk.old_offset();
        if offset < cursor || offset > old_lines.len() {
            return None;
        }
        for line in &old_lines[cursor..offset] {
            push(&mut output, line.text, line.has_newline);
        }
        cursor = offset;

        for line in &hunk.lines {
            match line.kind {
                DiffLineKind::Added => push(&mut output, &line.text, line.has_newline),
                DiffLineKind::Context | DiffLineKind::Removed => {
                    let original = old_lines.get(cursor)?;
                    if original.text != line.text || original.has_newline != line.has_newline {
                        return None;
                    }
                    if line.kind == DiffLineKind::Context {
                        push(&mut output, original.text, original.has_newline);
                    }
                    cursor += 1;
                }
            }
        }
    }

    for line in &old_lines[cursor..] {
        push(&mut output, line.text, line.has_newline);
    }

    Some(output)
}
