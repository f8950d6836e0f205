use crate::artifacts::diff::edit_list::Edit;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Lines touched in one file of a change-set
///
/// Line numbers are zero-indexed: added lines against the new version of the file,
/// deleted lines against the old one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitChange {
    path: String,
    added_lines: BTreeSet<usize>,
    deleted_lines: BTreeSet<usize>,
}

impl GitChange {
    pub fn new(path: impl Into<String>, added_lines: BTreeSet<usize>, deleted_lines: BTreeSet<usize>) -> Self {
        GitChange {
            path: path.into(),
            added_lines,
            deleted_lines,
        }
    }

    /// Expand `edits` into the individual line numbers they span
    pub fn from_edits(path: impl Into<String>, edits: &[Edit]) -> Self {
        let added_lines = edits.iter().flat_map(Edit::added_lines).collect();
        let deleted_lines = edits.iter().flat_map(Edit::deleted_lines).collect();

        Self::new(path, added_lines, deleted_lines)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn added_lines(&self) -> &BTreeSet<usize> {
        &self.added_lines
    }

    pub fn deleted_lines(&self) -> &BTreeSet<usize> {
        &self.deleted_lines
    }

    /// Touched at the path level only, e.g. a pure rename or a mode change
    pub fn is_path_only(&self) -> bool {
        self.added_lines.is_empty() && self.deleted_lines.is_empty()
    }
}
