//! Git data structures and the algorithms built on them
//!
//! - `branch`: Branch name validation
//! - `changes`: Extraction facade, options and the `GitChange` record
//! - `database`: Tree entries, pack indexes, packfiles and deltas
//! - `diff`: Tree diffing, rename detection and Myers' line diff
//! - `graph`: Commit graph access (branch tips and parents)
//! - `merge`: Best common ancestor search
//! - `modules`: Classification of changed paths into rule modules
//! - `objects`: Git object types (blob, tree, commit)

pub mod branch;
pub mod changes;
pub mod database;
pub mod diff;
pub mod graph;
pub mod merge;
pub mod modules;
pub mod objects;
