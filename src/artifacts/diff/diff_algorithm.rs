use derive_new::new;

/// One step of an edit script
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOp<T> {
    Delete { value: T },
    Insert { value: T },
    Equal { value: T },
}

impl<T> EditOp<T> {
    pub fn is_equal(&self) -> bool {
        matches!(self, EditOp::Equal { .. })
    }
}

pub trait DiffAlgorithm<'d, T> {
    type Trace;
    type EditPath;
    type EditScript;

    fn compute_shortest_edit(&self) -> Self::Trace;
    fn backtrack(&self) -> Self::EditPath;
    fn diff(&self) -> Self::EditScript;
}

/// Myers' O(ND) shortest edit script
///
/// `diff` strips the common prefix and suffix first and runs the search on what
/// remains. Each trace row keeps only the diagonals `-d..=d` live at step `d`.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct MyersDiff<'d, T> {
    a: &'d [T],
    b: &'d [T],
}

impl<'d, T: Eq + Clone> MyersDiff<'d, T> {
    fn common_prefix_len(&self) -> usize {
        self.a
            .iter()
            .zip(self.b.iter())
            .take_while(|(x, y)| x == y)
            .count()
    }

    fn common_suffix_len(&self, prefix_len: usize) -> usize {
        self.a[prefix_len..]
            .iter()
            .rev()
            .zip(self.b[prefix_len..].iter().rev())
            .take_while(|(x, y)| x == y)
            .count()
    }

    /// Edit script of the untrimmed inputs
    fn edit_script(&self) -> Vec<EditOp<T>> {
        let mut diff = Vec::new();

        for (prev_x, prev_y, x, y) in self.backtrack() {
            if x == prev_x {
                diff.push(EditOp::Insert {
                    value: self.b[prev_y as usize].clone(),
                });
            } else if y == prev_y {
                diff.push(EditOp::Delete {
                    value: self.a[prev_x as usize].clone(),
                });
            } else {
                diff.push(EditOp::Equal {
                    value: self.a[prev_x as usize].clone(),
                });
            }
        }

        diff.reverse();
        diff
    }
}

/// Value on diagonal `k` in the trace row of step `d`
fn window_get(row: &[isize], d: isize, k: isize) -> isize {
    row[(k + d) as usize]
}

impl<'d, T: Eq + Clone> DiffAlgorithm<'d, T> for MyersDiff<'d, T> {
    type Trace = Vec<Vec<isize>>;
    type EditPath = Vec<(isize, isize, isize, isize)>;
    type EditScript = Vec<EditOp<T>>;

    fn compute_shortest_edit(&self) -> Self::Trace {
        let (n, m) = (self.a.len() as isize, self.b.len() as isize);
        let mut trace = Vec::new();
        if n + m == 0 {
            return trace;
        }

        let offset = (n + m) as usize;
        let mut v = vec![0; 2 * offset + 1];

        for d in 0..=(n + m) {
            // diagonals -d..=d of the previous step, which is all backtracking reads
            let low = offset - d as usize;
            trace.push(v[low..=low + 2 * d as usize].to_vec());

            for k in (-d..=d).step_by(2) {
                let idx = (offset as isize + k) as usize;

                let mut x = if k == -d {
                    // we could have only come from k+1, thus an insertion
                    v[idx + 1]
                } else if k == d {
                    // we could have only come from k-1, thus a deletion
                    v[idx - 1] + 1
                } else {
                    let x_del = v[idx - 1] + 1;
                    let x_ins = v[idx + 1];
                    x_del.max(x_ins)
                };

                let mut y = x - k;
                while x < n && y < m && self.a[x as usize] == self.b[y as usize] {
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

    fn backtrack(&self) -> Self::EditPath {
        let (mut x, mut y) = (self.a.len() as isize, self.b.len() as isize);
        let mut edit_path = Vec::new();

        let trace = self.compute_shortest_edit();

        for (d, row) in trace.iter().enumerate().rev() {
            let d = d as isize;
            let k = x - y;

            let prev_k = if k == -d {
                k + 1
            } else if k == d {
                k - 1
            } else {
                let k_del = k - 1;
                let k_ins = k + 1;
                if window_get(row, d, k_del) + 1 > window_get(row, d, k_ins) {
                    k_del
                } else {
                    k_ins
                }
            };

            let (prev_x, prev_y) = if d == 0 {
                (0, 0)
            } else {
                let prev_x = window_get(row, d, prev_k);
                (prev_x, prev_x - prev_k)
            };

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

    fn diff(&self) -> Self::EditScript {
        let prefix_len = self.common_prefix_len();
        let suffix_len = self.common_suffix_len(prefix_len);

        let middle = MyersDiff::new(
            &self.a[prefix_len..self.a.len() - suffix_len],
            &self.b[prefix_len..self.b.len() - suffix_len],
        );

        let prefix = self.a[..prefix_len]
            .iter()
            .map(|value| EditOp::Equal { value: value.clone() });
        let suffix = self.a[self.a.len() - suffix_len..]
            .iter()
            .map(|value| EditOp::Equal { value: value.clone() });

        prefix.chain(middle.edit_script()).chain(suffix).collect()
    }
}
