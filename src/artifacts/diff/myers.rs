use derive_new::new;

/// One step of an edit script, as positions into the two inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit {
    Delete { old: usize },
    Insert { new: usize },
    Equal { old: usize, new: usize },
}

impl Edit {
    pub fn is_equal(&self) -> bool {
        matches!(self, Edit::Equal { .. })
    }
}

/// Myers' O(ND) shortest edit script
///
/// The common prefix and suffix are matched up front; only the middle goes
/// through the greedy search. Each round of the search keeps just the
/// diagonals it can reach, so the trace grows with D² rather than D·(N+M).
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct MyersDiff<'d, T> {
    a: &'d [T],
    b: &'d [T],
}

type Trace = Vec<Vec<isize>>;
type EditPath = Vec<(isize, isize, isize, isize)>;

impl<T: Eq> MyersDiff<'_, T> {
    pub fn diff(&self) -> Vec<Edit> {
        let prefix = self
            .a
            .iter()
            .zip(self.b)
            .take_while(|(a, b)| a == b)
            .count();
        let suffix = self.a[prefix..]
            .iter()
            .rev()
            .zip(self.b[prefix..].iter().rev())
            .take_while(|(a, b)| a == b)
            .count();

        let a = &self.a[prefix..self.a.len() - suffix];
        let b = &self.b[prefix..self.b.len() - suffix];

        let mut edits = (0..prefix)
            .map(|i| Edit::Equal { old: i, new: i })
            .collect::<Vec<_>>();
        edits.extend(Self::middle(a, b).into_iter().map(|edit| match edit {
            Edit::Delete { old } => Edit::Delete { old: old + prefix },
            Edit::Insert { new } => Edit::Insert { new: new + prefix },
            Edit::Equal { old, new } => Edit::Equal {
                old: old + prefix,
                new: new + prefix,
            },
        }));
        edits.extend((0..suffix).map(|i| Edit::Equal {
            old: prefix + a.len() + i,
            new: prefix + b.len() + i,
        }));

        edits
    }

    fn middle(a: &[T], b: &[T]) -> Vec<Edit> {
        if a.is_empty() {
            return (0..b.len()).map(|new| Edit::Insert { new }).collect();
        }
        if b.is_empty() {
            return (0..a.len()).map(|old| Edit::Delete { old }).collect();
        }

        let mut edits = Self::backtrack(a, b, &Self::shortest_edit(a, b))
            .into_iter()
            .map(|(prev_x, prev_y, x, y)| {
                if x == prev_x {
                    Edit::Insert {
                        new: prev_y as usize,
                    }
                } else if y == prev_y {
                    Edit::Delete {
                        old: prev_x as usize,
                    }
                } else {
                    Edit::Equal {
                        old: prev_x as usize,
                        new: prev_y as usize,
                    }
                }
            })
            .collect::<Vec<_>>();

        edits.reverse();
        edits
    }

    /// Furthest-reaching x per diagonal, snapshotted before every round.
    /// Round `d` stores diagonals `-(d+1)..=d+1`.
    fn shortest_edit(a: &[T], b: &[T]) -> Trace {
        let (n, m) = (a.len() as isize, b.len() as isize);
        let max = n + m;
        let offset = max + 1;

        let mut v = vec![0isize; (2 * max + 3) as usize];
        let mut trace = Vec::new();

        for d in 0..=max {
            trace.push(v[(offset - d - 1) as usize..=(offset + d + 1) as usize].to_vec());

            for k in (-d..=d).step_by(2) {
                let idx = (offset + k) as usize;

                let mut x = if k == -d {
                    // we could have only come from k+1, thus an insertion
                    v[idx + 1]
                } else if k == d {
                    // we could have only come from k-1, thus a deletion
                    v[idx - 1] + 1
                } else {
                    let x_del = v[idx - 1] + 1;
                    let x_ins = v[idx + 1];
                    if x_del > x_ins { x_del } else { x_ins }
                };

                let mut y = x - k;
                while x < n && y < m && a[x as usize] == b[y as usize] {
                    // snake
                    x += 1;
                    y += 1;
                }

                v[idx] = x;

                if x >= n && y >= m {
                    return trace;
                }
            }
        }

        trace
    }

    fn backtrack(a: &[T], b: &[T], trace: &Trace) -> EditPath {
        let (mut x, mut y) = (a.len() as isize, b.len() as isize);
        let mut edit_path = Vec::new();

        for (d, v) in trace.iter().enumerate().rev() {
            let d = d as isize;
            let at = |k: isize| v[(k + d + 1) as usize];
            let k = x - y;

            let prev_k = if k == -d {
                k + 1
            } else if k == d {
                k - 1
            } else if at(k - 1) + 1 > at(k + 1) {
                k - 1
            } else {
                k + 1
            };

            let prev_x = at(prev_k);
            let prev_y = prev_x - prev_k;

            while x > prev_x && y > prev_y {
                edit_path.push((x - 1, y - 1, x, y));
                x -= 1;
                y -= 1;
            }

            if d > 0 {
                edit_path.push((prev_x, prev_y, x, y));
            }

            (x, y) = (prev_x, prev_y);
        }

        edit_path
    }
}
