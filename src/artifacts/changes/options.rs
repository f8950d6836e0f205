use crate::artifacts::diff::rename_detector::{DEFAULT_RENAME_LIMIT, DEFAULT_RENAME_THRESHOLD};

pub const DEFAULT_TRUNK: &str = "master";

/// Knobs of one extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Branch the candidate is compared against
    pub trunk: String,
    pub detect_renames: bool,
    /// Minimum similarity percentage for an inexact rename or copy
    pub rename_threshold: u8,
    pub rename_limit: usize,
    /// Re-hash every object read and compare it to its id
    pub verify_objects: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions {
            trunk: DEFAULT_TRUNK.to_string(),
            detect_renames: true,
            rename_threshold: DEFAULT_RENAME_THRESHOLD,
            rename_limit: DEFAULT_RENAME_LIMIT,
            verify_objects: false,
        }
    }
}

impl ExtractOptions {
    pub fn with_trunk(mut self, trunk: impl Into<String>) -> Self {
        self.trunk = trunk.into();
        self
    }

    pub fn with_detect_renames(mut self, detect_renames: bool) -> Self {
        self.detect_renames = detect_renames;
        self
    }

    pub fn with_rename_threshold(mut self, rename_threshold: u8) -> Self {
        self.rename_threshold = rename_threshold.min(100);
        self
    }

    pub fn with_rename_limit(mut self, rename_limit: usize) -> Self {
        self.rename_limit = rename_limit;
        self
    }

    pub fn with_verify_objects(mut self, verify_objects: bool) -> Self {
        self.verify_objects = verify_objects;
        self
    }
}
