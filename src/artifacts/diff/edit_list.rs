//! Line-level edit lists between two blob versions
//!
//! Content is split into lines after each `\n`; a last line without a newline is
//! still a line, and differs from the same text with one. Each maximal run of
//! deleted and inserted lines between two equal lines becomes one [`Edit`].

use crate::artifacts::diff::diff_algorithm::{DiffAlgorithm, EditOp, MyersDiff};
use derive_new::new;
use std::collections::HashMap;
use std::ops::Range;

/// Bytes inspected for a NUL when deciding whether content is binary
pub const BINARY_PROBE_LEN: usize = 8000;

/// A contiguous replaced region, zero-indexed and end-exclusive on both sides
///
/// `old_start == old_end` is a pure insertion, `new_start == new_end` a pure deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, new)]
pub struct Edit {
    pub old_start: usize,
    pub old_end: usize,
    pub new_start: usize,
    pub new_end: usize,
}

impl Edit {
    pub fn is_insert(&self) -> bool {
        self.old_start == self.old_end && self.new_start < self.new_end
    }

    pub fn is_delete(&self) -> bool {
        self.new_start == self.new_end && self.old_start < self.old_end
    }

    pub fn is_replace(&self) -> bool {
        self.old_start < self.old_end && self.new_start < self.new_end
    }

    /// Lines of the old version this edit removes
    pub fn deleted_lines(&self) -> Range<usize> {
        self.old_start..self.old_end
    }

    /// Lines of the new version this edit adds
    pub fn added_lines(&self) -> Range<usize> {
        self.new_start..self.new_end
    }
}

pub fn is_binary(content: &[u8]) -> bool {
    content[..content.len().min(BINARY_PROBE_LEN)].contains(&0)
}

pub fn split_lines(content: &[u8]) -> Vec<&[u8]> {
    content.split_inclusive(|byte| *byte == b'\n').collect()
}

/// Edits turning `old` into `new`, empty when either side is binary
pub fn compute_line_edits(old: &[u8], new: &[u8]) -> Vec<Edit> {
    if is_binary(old) || is_binary(new) {
        return Vec::new();
    }

    let old_lines = split_lines(old);
    let new_lines = split_lines(new);

    edits_from_script(&MyersDiff::new(&old_lines, &new_lines).diff())
}

/// Collapse an edit script into ranges
pub fn edits_from_script<T>(script: &[EditOp<T>]) -> Vec<Edit> {
    let mut edits = Vec::new();
    let (mut old_line, mut new_line) = (0, 0);
    let mut pending: Option<Edit> = None;

    for op in script {
        match op {
            EditOp::Equal { .. } => {
                edits.extend(pending.take());
                old_line += 1;
                new_line += 1;
            }
            EditOp::Delete { .. } => {
                let edit = pending.get_or_insert(Edit::new(old_line, old_line, new_line, new_line));
                edit.old_end += 1;
                old_line += 1;
            }
            EditOp::Insert { .. } => {
                let edit = pending.get_or_insert(Edit::new(old_line, old_line, new_line, new_line));
                edit.new_end += 1;
                new_line += 1;
            }
        }
    }

    edits.extend(pending);
    edits
}

/// Multiset of the lines of one text, for scoring rename candidates
#[derive(Debug, Clone)]
pub struct LineCounts<'a> {
    counts: HashMap<&'a [u8], u32>,
    total: usize,
}

impl<'a> LineCounts<'a> {
    pub fn new(content: &'a [u8]) -> Self {
        let mut counts = HashMap::new();
        let mut total = 0;
        for line in split_lines(content) {
            *counts.entry(line).or_insert(0) += 1;
            total += 1;
        }

        LineCounts { counts, total }
    }

    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Upper bound of [`LineCounts::similarity`], from the line totals alone
    pub fn max_similarity(&self, other: &LineCounts) -> u8 {
        let longest = self.total.max(other.total);
        if longest == 0 {
            return 100;
        }

        (100 * self.total.min(other.total) / longest) as u8
    }

    /// Lines shared by both texts, as a percentage of the longer one
    pub fn similarity(&self, other: &LineCounts) -> u8 {
        let longest = self.total.max(other.total);
        if longest == 0 {
            return 100;
        }

        let (smaller, larger) = if self.counts.len() <= other.counts.len() {
            (self, other)
        } else {
            (other, self)
        };
        let shared: usize = smaller
            .counts
            .iter()
            .filter_map(|(line, count)| {
                larger
                    .counts
                    .get(line)
                    .map(|other_count| (*count).min(*other_count) as usize)
            })
            .sum();

        (100 * shared / longest) as u8
    }
}

/// Share of lines two texts have in common, as a percentage of the longer one
pub fn similarity(old: &[u8], new: &[u8]) -> u8 {
    LineCounts::new(old).similarity(&LineCounts::new(new))
}
