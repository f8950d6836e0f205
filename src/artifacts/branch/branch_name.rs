use crate::artifacts::branch::{HEAD_REF_NAME, HEADS_PREFIX, INVALID_BRANCH_NAME_REGEX, REF_PREFIX};
use crate::errors::{ExtractError, Result};
use anyhow::Context;

/// A validated branch name, either short (`feature/x`) or a full ref name
/// (`refs/remotes/origin/master`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BranchName(String);

impl BranchName {
    pub fn try_parse(name: impl Into<String>) -> Result<Self> {
        let name = name.into();

        match Self::is_valid(&name) {
            Ok(true) => Ok(Self(name)),
            Ok(false) | Err(_) => Err(ExtractError::InvalidBranchName { name }),
        }
    }

    fn is_valid(name: &str) -> anyhow::Result<bool> {
        if name.is_empty() {
            return Ok(false);
        }

        let re = regex::Regex::new(INVALID_BRANCH_NAME_REGEX)
            .with_context(|| format!("invalid branch name regex: {INVALID_BRANCH_NAME_REGEX}"))?;

        Ok(!re.is_match(name))
    }

    /// Path of the ref relative to the git directory
    pub fn ref_path(&self) -> String {
        if self.0 == HEAD_REF_NAME || self.0.starts_with(REF_PREFIX) {
            self.0.clone()
        } else {
            format!("{HEADS_PREFIX}{}", self.0)
        }
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
