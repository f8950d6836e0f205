//! Merge-base resolution

pub mod bca_finder;

use crate::artifacts::graph::commit_graph::CommitGraph;
use crate::artifacts::merge::bca_finder::BCAFinder;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::Result;

/// Best common ancestor of `candidate` and `trunk`, `None` for disjoint histories
pub fn find_merge_base(
    graph: &CommitGraph<'_>,
    candidate: &ObjectId,
    trunk: &ObjectId,
) -> Result<Option<ObjectId>> {
    let finder = BCAFinder::new(|oid| graph.slim_commit(oid));
    let merge_base = finder.find_best_common_ancestor(candidate, trunk)?;

    tracing::debug!(
        %candidate,
        %trunk,
        merge_base = merge_base.as_ref().map(ObjectId::to_short_oid).as_deref(),
        "merge base search finished"
    );

    Ok(merge_base)
}
