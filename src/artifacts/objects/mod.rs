//! Git object types as read from the object store
//!
//! Git stores all content as objects identified by SHA-1 hashes:
//!
//! - **Blob**: File content (raw bytes)
//! - **Tree**: Directory listing (names, modes, and object IDs)
//! - **Commit**: Snapshot with metadata (tree, parent commits, author, message)
//!
//! Objects are only ever deserialized here; the engine never writes to the store.
//! Loose objects carry the `<type> <size>\0<content>` header, packed objects carry
//! their type in the pack entry header.

pub mod blob;
pub mod commit;
pub mod entry_mode;
pub mod object;
pub mod object_id;
pub mod object_type;
pub mod tree;

/// Length of a SHA-1 hash in hexadecimal format
pub const OBJECT_ID_LENGTH: usize = 40;

/// Length of a SHA-1 hash in binary format
pub const RAW_OBJECT_ID_LENGTH: usize = 20;
