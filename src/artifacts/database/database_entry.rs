use crate::artifacts::objects::entry_mode::EntryMode;
use crate::artifacts::objects::object_id::ObjectId;
use derive_new::new;

/// A tree entry as read from the database: the object it names and its mode
#[derive(Debug, Clone, PartialEq, Eq, Hash, new)]
pub struct DatabaseEntry {
    pub oid: ObjectId,
    pub mode: EntryMode,
}

impl DatabaseEntry {
    pub fn is_tree(&self) -> bool {
        self.mode.is_tree()
    }

    /// Regular file, executable or symlink, whose content is a blob in this repository
    pub fn is_blob(&self) -> bool {
        matches!(self.mode, EntryMode::File(_))
    }
}
