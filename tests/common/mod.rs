#![allow(dead_code)]

pub mod command;
pub mod pack;
pub mod repo;

use std::collections::BTreeSet;

/// Line set literal for assertions
pub fn lines<const N: usize>(lines: [usize; N]) -> BTreeSet<usize> {
    BTreeSet::from(lines)
}

/// `count` numbered lines, `prefix-0\n` to `prefix-{count-1}\n`
pub fn numbered_lines(prefix: &str, count: usize) -> String {
    (0..count).map(|i| format!("{prefix}-{i}\n")).collect()
}
