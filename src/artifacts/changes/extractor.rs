use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::changes::aggregator::aggregate;
use crate::artifacts::changes::git_change::GitChange;
use crate::artifacts::changes::options::ExtractOptions;
use crate::artifacts::diff::diff_entry::{ChangeType, DiffEntry};
use crate::artifacts::diff::edit_list::{Edit, compute_line_edits};
use crate::artifacts::diff::rename_detector::RenameDetector;
use crate::artifacts::graph::commit_graph::CommitGraph;
use crate::artifacts::merge::find_merge_base;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object::Object;
use crate::errors::{ExtractError, Result};
use bytes::Bytes;
use std::path::Path;

/// An open repository plus the options of one extraction
///
/// Owns the repository handle; every file it opened is released when it drops.
#[derive(Debug)]
pub struct ChangeExtractor {
    repository: Repository,
    options: ExtractOptions,
}

/// Tips of both branches and the merge base between them
struct Comparison {
    merge_base: Commit,
    candidate_tip: Commit,
}

impl ChangeExtractor {
    pub fn open(repo_path: impl AsRef<Path>, options: ExtractOptions) -> Result<Self> {
        let repository = Repository::open(repo_path, options.verify_objects)?;

        Ok(ChangeExtractor {
            repository,
            options,
        })
    }

    /// Best common ancestor of `candidate` and the trunk
    pub fn merge_base(&self, candidate: &str) -> Result<Commit> {
        Ok(self.compare(candidate)?.merge_base)
    }

    /// Path-level changes from the merge base to the tip of `candidate`
    pub fn diff_entries(&self, candidate: &str) -> Result<Vec<DiffEntry>> {
        let comparison = self.compare(candidate)?;
        self.diff_commits(&comparison)
    }

    /// Files and lines changed on `candidate` since it forked from the trunk
    pub fn extract(&self, candidate: &str) -> Result<Vec<GitChange>> {
        let comparison = self.compare(candidate)?;
        let entries = self.diff_commits(&comparison)?;

        let edits_by_entry = entries
            .iter()
            .map(|entry| self.line_edits(entry))
            .collect::<Result<Vec<_>>>()?;

        let changes = aggregate(&entries, &edits_by_entry);
        tracing::info!(
            candidate,
            trunk = %self.options.trunk,
            merge_base = %comparison.merge_base.object_id().to_short_oid(),
            changes = changes.len(),
            "extracted changes"
        );

        Ok(changes)
    }

    fn compare(&self, candidate: &str) -> Result<Comparison> {
        let candidate_name = BranchName::try_parse(candidate)?;
        let trunk_name = BranchName::try_parse(self.options.trunk.as_str())?;
        let graph = CommitGraph::new(&self.repository);

        let candidate_tip = graph.resolve_branch_tip(&candidate_name)?;
        let trunk_tip = graph.resolve_branch_tip(&trunk_name)?;

        let merge_base_oid = find_merge_base(&graph, candidate_tip.object_id(), trunk_tip.object_id())?
            .ok_or_else(|| ExtractError::NoCommonAncestor {
                candidate: format!("{candidate_name} ({})", candidate_tip.object_id()),
                trunk: format!("{trunk_name} ({})", trunk_tip.object_id()),
            })?;
        let merge_base = graph.load_commit(&merge_base_oid)?;
        tracing::debug!(
            merge_base = %merge_base_oid,
            summary = merge_base.short_message(),
            "found merge base"
        );

        Ok(Comparison {
            merge_base,
            candidate_tip,
        })
    }

    fn diff_commits(&self, comparison: &Comparison) -> Result<Vec<DiffEntry>> {
        let database = self.repository.database();
        let entries = database
            .tree_diff(
                Some(comparison.merge_base.tree_oid()),
                Some(comparison.candidate_tip.tree_oid()),
            )?
            .into_entries();

        tracing::debug!(entries = entries.len(), "compared trees");

        let entries = if self.options.detect_renames {
            RenameDetector::new(
                database,
                self.options.rename_threshold,
                self.options.rename_limit,
            )
            .detect(entries)?
        } else {
            entries
        };

        for entry in &entries {
            tracing::trace!(%entry, "diff entry");
        }

        Ok(entries)
    }

    /// Line edits of one entry; deletions, gitlinks and unchanged content have none
    fn line_edits(&self, entry: &DiffEntry) -> Result<Vec<Edit>> {
        if entry.change_type() == ChangeType::Delete {
            return Ok(Vec::new());
        }

        let Some(new_entry) = entry.new_entry().filter(|new| new.is_blob()) else {
            return Ok(Vec::new());
        };
        let old_entry = entry.old_entry().filter(|old| old.is_blob());

        if old_entry.is_some_and(|old| old.oid == new_entry.oid) {
            return Ok(Vec::new());
        }

        let database = self.repository.database();
        let old_content = match old_entry {
            Some(old) => database.load_blob_content(&old.oid)?,
            None => Bytes::new(),
        };
        let new_content = database.load_blob_content(&new_entry.oid)?;

        Ok(compute_line_edits(&old_content, &new_content))
    }
}

/// Open `repo_path`, extract the changes of `candidate` and release the repository
pub fn extract_changes(
    repo_path: impl AsRef<Path>,
    candidate: &str,
    options: ExtractOptions,
) -> Result<Vec<GitChange>> {
    ChangeExtractor::open(repo_path, options)?.extract(candidate)
}
