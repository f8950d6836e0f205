//! Object database storage formats
//!
//! - `database_entry`: Tree entries as read from the database
//! - `pack_index`: Pack index (`.idx`) lookup tables
//! - `pack_file`: Pack (`.pack`) entry decoding
//! - `delta`: Git delta instruction streams used by deltified pack entries

pub mod database_entry;
pub mod delta;
pub mod pack_file;
pub mod pack_index;
