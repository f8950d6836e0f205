use crate::areas::database::Database;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::diff::diff_entry::DiffEntry;
use crate::artifacts::objects::object::ObjectBox;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::Tree;
use crate::errors::{ExtractError, Result};
use std::collections::BTreeMap;

/// Name of the administrative directory never reported as content
const GIT_DIR_NAME: &str = ".git";

#[derive(Debug, Clone, PartialEq)]
pub enum TreeChangeType {
    Added(DatabaseEntry),
    Deleted(DatabaseEntry),
    Modified {
        old: DatabaseEntry,
        new: DatabaseEntry,
    },
}

impl TreeChangeType {
    pub fn from_entries(old: Option<DatabaseEntry>, new: Option<DatabaseEntry>) -> Option<Self> {
        match (old, new) {
            (None, Some(new)) => Some(TreeChangeType::Added(new)),
            (Some(old), None) => Some(TreeChangeType::Deleted(old)),
            // a mode-only change is still a modification
            (Some(old), Some(new)) if old != new => Some(TreeChangeType::Modified { old, new }),
            _ => None,
        }
    }

    pub fn old_entry(&self) -> Option<&DatabaseEntry> {
        match self {
            TreeChangeType::Deleted(entry) => Some(entry),
            TreeChangeType::Modified { old, .. } => Some(old),
            TreeChangeType::Added(_) => None,
        }
    }

    pub fn new_entry(&self) -> Option<&DatabaseEntry> {
        match self {
            TreeChangeType::Added(entry) => Some(entry),
            TreeChangeType::Modified { new, .. } => Some(new),
            TreeChangeType::Deleted(_) => None,
        }
    }

    fn into_diff_entry(self, path: String) -> DiffEntry {
        match self {
            TreeChangeType::Added(entry) => DiffEntry::added(path, entry),
            TreeChangeType::Deleted(entry) => DiffEntry::deleted(path, entry),
            TreeChangeType::Modified { old, new } => DiffEntry::modified(path, old, new),
        }
    }
}

/// Changes keyed by `/`-joined path; byte order of the keys is git's path order
pub type ChangeSet = BTreeMap<String, TreeChangeType>;
pub type TreeEntryMap = BTreeMap<String, DatabaseEntry>;

/// Recursive, path-synchronized comparison of two trees
#[derive(Debug)]
pub struct TreeDiff<'r> {
    database: &'r Database,
    change_set: ChangeSet,
}

impl<'r> TreeDiff<'r> {
    pub fn new(database: &'r Database) -> Self {
        TreeDiff {
            database,
            change_set: BTreeMap::new(),
        }
    }

    /// Path-ordered diff entries, before rename detection
    pub fn into_entries(self) -> Vec<DiffEntry> {
        self.change_set
            .into_iter()
            .map(|(path, change)| change.into_diff_entry(path))
            .collect()
    }

    /// Compare two trees (or the trees of two commits) under `prefix`
    pub fn compare_oids(
        &mut self,
        old: Option<&ObjectId>,
        new: Option<&ObjectId>,
        prefix: &str,
    ) -> Result<()> {
        if old == new {
            return Ok(());
        }

        let old_tree_entries = self.inflate_oid_to_tree_entries(old)?;
        let new_tree_entries = self.inflate_oid_to_tree_entries(new)?;

        self.detect_deletions(&old_tree_entries, &new_tree_entries, prefix)?;
        self.detect_additions(&old_tree_entries, &new_tree_entries, prefix)?;

        Ok(())
    }

    fn inflate_oid_to_tree_entries(&self, oid: Option<&ObjectId>) -> Result<TreeEntryMap> {
        match oid {
            None => Ok(BTreeMap::new()),
            Some(oid) => Ok(self
                .inflate_oid_to_tree(oid)?
                .into_entries()
                .filter(|(name, _)| name != GIT_DIR_NAME)
                .collect::<BTreeMap<_, _>>()),
        }
    }

    fn inflate_oid_to_tree(&self, oid: &ObjectId) -> Result<Tree> {
        match self.database.parse_object(oid)? {
            ObjectBox::Tree(tree) => Ok(*tree),
            ObjectBox::Commit(commit) => self.inflate_oid_to_tree(commit.tree_oid()),
            ObjectBox::Blob(_) => Err(ExtractError::corruption(
                oid,
                anyhow::anyhow!("unexpected object type: expected tree, found blob"),
            )),
        }
    }

    fn join_path(prefix: &str, name: &str) -> String {
        if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}/{name}")
        }
    }

    fn detect_deletions(
        &mut self,
        old: &TreeEntryMap,
        new: &TreeEntryMap,
        prefix: &str,
    ) -> Result<()> {
        for (name, entry) in old {
            let path = Self::join_path(prefix, name);
            let other = new.get(name);

            if let Some(other) = other
                && other == entry
            {
                continue;
            }

            let tree_a_oid = entry.is_tree().then_some(&entry.oid);
            let tree_b_oid = other
                .filter(|other| other.is_tree())
                .map(|other| &other.oid);

            self.compare_oids(tree_a_oid, tree_b_oid, &path)?;

            // a tree on one side and a file on the other is a delete/add pair
            let blob_a = (!entry.is_tree()).then(|| entry.clone());
            let blob_b = other.filter(|other| !other.is_tree()).cloned();

            if let Some(change_type) = TreeChangeType::from_entries(blob_a, blob_b) {
                self.change_set.insert(path, change_type);
            }
        }

        Ok(())
    }

    fn detect_additions(
        &mut self,
        old: &TreeEntryMap,
        new: &TreeEntryMap,
        prefix: &str,
    ) -> Result<()> {
        for (name, entry) in new {
            if old.contains_key(name) {
                continue;
            }

            let path = Self::join_path(prefix, name);
            if entry.is_tree() {
                self.compare_oids(None, Some(&entry.oid), &path)?;
            } else {
                self.change_set
                    .insert(path, TreeChangeType::Added(entry.clone()));
            }
        }

        Ok(())
    }
}
