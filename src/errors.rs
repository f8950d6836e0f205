//! Error taxonomy of the change extraction engine
//!
//! Every variant is fatal: an extraction either returns the complete change list or
//! one of these errors, never a partial result. Binary content is not an error; it
//! short-circuits to an empty edit list instead.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("no git repository found at {}", path.display())]
    RepositoryNotFound { path: PathBuf },

    #[error("invalid branch name '{name}'")]
    InvalidBranchName { name: String },

    #[error("branch '{name}' not found")]
    RefNotFound { name: String },

    #[error("{candidate} and {trunk} share no common ancestor")]
    NoCommonAncestor { candidate: String, trunk: String },

    #[error("object store corruption at {location}: {reason}")]
    ObjectStoreCorruption { location: String, reason: String },

    #[error("unable to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExtractError {
    /// Wrap a low-level parsing failure for the object or file at `location`
    pub fn corruption(location: impl ToString, reason: anyhow::Error) -> Self {
        ExtractError::ObjectStoreCorruption {
            location: location.to_string(),
            reason: format!("{reason:#}"),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ExtractError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = ExtractError> = std::result::Result<T, E>;
