//! Change extraction: from two branch names to the list of touched files and lines

pub mod aggregator;
pub mod extractor;
pub mod git_change;
pub mod options;
