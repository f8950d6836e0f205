use crate::artifacts::changes::git_change::GitChange;
use crate::artifacts::diff::diff_entry::{ChangeType, DiffEntry};
use crate::artifacts::diff::edit_list::Edit;

/// Build one [`GitChange`] per non-deleted entry, in entry order
///
/// `edits_by_entry[i]` holds the edits of `entries[i]`.
pub fn aggregate(entries: &[DiffEntry], edits_by_entry: &[Vec<Edit>]) -> Vec<GitChange> {
    entries
        .iter()
        .zip(edits_by_entry)
        .filter(|(entry, _)| entry.change_type() != ChangeType::Delete)
        .map(|(entry, edits)| GitChange::from_edits(entry.path(), edits))
        .collect()
}
