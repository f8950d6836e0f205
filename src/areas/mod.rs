//! Repository-facing components
//!
//! - `database`: object database over loose objects and packfiles
//! - `refs`: branch resolution over loose refs and `packed-refs`
//! - `repository`: repository discovery and the read-only handle tying both together

pub mod database;
pub mod refs;
pub mod repository;
