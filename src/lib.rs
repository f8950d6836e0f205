//! Change extraction for rule-engine regression runs
//!
//! Given a repository and a candidate branch, `changescope` finds the best common
//! ancestor with the trunk branch, diffs the two trees and reports, per touched file,
//! the exact added and deleted line numbers.
//!
//! - `areas`: Repository-facing components (object database, refs, repository handle)
//! - `artifacts`: Object types and the algorithms built on them (merge base, diff, changes)
//! - `errors`: The error taxonomy surfaced to callers

pub mod areas;
pub mod artifacts;
pub mod errors;

pub use artifacts::changes::extractor::{ChangeExtractor, extract_changes};
pub use artifacts::changes::git_change::GitChange;
pub use artifacts::changes::options::ExtractOptions;
pub use errors::{ExtractError, Result};
