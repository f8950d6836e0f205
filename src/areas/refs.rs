//! Git references (branches, HEAD, remote-tracking refs)
//!
//! References are human-readable names pointing to commits. They can be:
//! - Direct: containing a commit SHA-1
//! - Symbolic: pointing to another reference (e.g., HEAD -> refs/heads/master)
//!
//! ## Storage
//!
//! A ref is looked up as a loose file under the git directory first and then in
//! `packed-refs`, where `git gc` moves most of them:
//!
//! ```text
//! # pack-refs with: peeled fully-peeled sorted
//! 3f1c...e2 refs/heads/master
//! 9ab0...17 refs/tags/v1.0
//! ^77de...04
//! ```

use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::{ExtractError, Result};
use derive_new::new;
use std::path::Path;

/// Regex pattern for parsing symbolic references
const SYMREF_REGEX: &str = r"^ref: (.+)$";

/// Symbolic refs followed before giving up
const MAX_SYMREF_DEPTH: usize = 5;

/// Read-only view of a repository's references
#[derive(Debug, new)]
pub struct Refs {
    /// Path to the directory holding `refs/` and `packed-refs` (typically `.git`)
    path: Box<Path>,
}

/// Content of a loose ref file
#[derive(Debug, Clone)]
enum SymRefOrOid {
    SymRef { target: String },
    Oid(ObjectId),
}

impl SymRefOrOid {
    fn read_symref_or_oid(path: &Path) -> anyhow::Result<Option<SymRefOrOid>> {
        if !path.is_file() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)?;
        let content = content.trim();

        if content.is_empty() {
            return Ok(None);
        }

        let symref_match = regex::Regex::new(SYMREF_REGEX)?.captures(content);
        if let Some(symref_match) = symref_match {
            Ok(Some(SymRefOrOid::SymRef {
                target: symref_match[1].trim().to_string(),
            }))
        } else {
            Ok(Some(SymRefOrOid::Oid(ObjectId::try_parse(
                content.to_string(),
            )?)))
        }
    }
}

impl Refs {
    /// Resolve a branch to the commit id at its tip
    ///
    /// Fails with `RefNotFound` when neither a loose ref nor a packed ref exists.
    pub fn resolve_branch(&self, branch_name: &BranchName) -> Result<ObjectId> {
        let oid = self.read_ref(&branch_name.ref_path(), 0)?;

        oid.ok_or_else(|| ExtractError::RefNotFound {
            name: branch_name.to_string(),
        })
    }

    fn read_ref(&self, ref_path: &str, depth: usize) -> Result<Option<ObjectId>> {
        if depth > MAX_SYMREF_DEPTH {
            return Err(ExtractError::corruption(
                ref_path,
                anyhow::anyhow!("symbolic ref chain deeper than {MAX_SYMREF_DEPTH}"),
            ));
        }

        let loose_path = self.path.join(ref_path);
        let loose = SymRefOrOid::read_symref_or_oid(&loose_path)
            .map_err(|e| ExtractError::corruption(loose_path.display(), e))?;

        match loose {
            Some(SymRefOrOid::SymRef { target }) => self.read_ref(&target, depth + 1),
            Some(SymRefOrOid::Oid(oid)) => Ok(Some(oid)),
            None => self.read_packed_ref(ref_path),
        }
    }

    fn read_packed_ref(&self, ref_path: &str) -> Result<Option<ObjectId>> {
        let packed_refs_path = self.packed_refs_path();
        if !packed_refs_path.is_file() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&packed_refs_path)
            .map_err(|e| ExtractError::io(&*packed_refs_path, e))?;

        for line in content.lines() {
            let line = line.trim_end();
            // header comments and peeled tag targets
            if line.is_empty() || line.starts_with('#') || line.starts_with('^') {
                continue;
            }

            let Some((oid, name)) = line.split_once(' ') else {
                return Err(ExtractError::corruption(
                    packed_refs_path.display(),
                    anyhow::anyhow!("malformed line '{line}'"),
                ));
            };

            if name == ref_path {
                let oid = ObjectId::try_parse(oid.to_string())
                    .map_err(|e| ExtractError::corruption(packed_refs_path.display(), e))?;
                return Ok(Some(oid));
            }
        }

        Ok(None)
    }

    pub fn packed_refs_path(&self) -> Box<Path> {
        self.path.join("packed-refs").into_boxed_path()
    }
}
