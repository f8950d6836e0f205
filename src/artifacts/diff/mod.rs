//! Tree comparison and line-level diffing
//!
//! - `tree_diff`: path-level changes between two trees
//! - `rename_detector`: pairs deletions and additions into renames and copies
//! - `diff_algorithm`: Myers' shortest edit script
//! - `edit_list`: line ranges replaced between two blob versions

pub mod diff_algorithm;
pub mod diff_entry;
pub mod edit_list;
pub mod rename_detector;
pub mod tree_diff;
