use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::objects::commit::{Commit, SlimCommit};
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::Result;
use derive_new::new;

/// Commit-level access to a repository: branch tips and ancestry
///
/// Nothing is cached; every call re-reads the object store.
#[derive(Debug, Clone, Copy, new)]
pub struct CommitGraph<'r> {
    repository: &'r Repository,
}

impl<'r> CommitGraph<'r> {
    /// Commit at the tip of `branch_name`
    pub fn resolve_branch_tip(&self, branch_name: &BranchName) -> Result<Commit> {
        let oid = self.repository.refs().resolve_branch(branch_name)?;
        tracing::debug!(branch = %branch_name, tip = %oid, "resolved branch tip");

        self.load_commit(&oid)
    }

    pub fn load_commit(&self, oid: &ObjectId) -> Result<Commit> {
        self.repository.database().parse_object_as_commit(oid)
    }

    pub fn slim_commit(&self, oid: &ObjectId) -> Result<SlimCommit> {
        Ok(self.load_commit(oid)?.to_slim())
    }
}
