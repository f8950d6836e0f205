use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::objects::object_id::ObjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeType {
    Add,
    Modify,
    Rename,
    Copy,
    Delete,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Add => "ADD",
            ChangeType::Modify => "MODIFY",
            ChangeType::Rename => "RENAME",
            ChangeType::Copy => "COPY",
            ChangeType::Delete => "DELETE",
        }
    }

    pub fn status_char(&self) -> char {
        match self {
            ChangeType::Add => 'A',
            ChangeType::Modify => 'M',
            ChangeType::Rename => 'R',
            ChangeType::Copy => 'C',
            ChangeType::Delete => 'D',
        }
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One path-level change between two trees
///
/// Added entries have no old side and deleted entries no new side; every other
/// change type has both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry {
    change_type: ChangeType,
    old_path: Option<String>,
    new_path: Option<String>,
    old_entry: Option<DatabaseEntry>,
    new_entry: Option<DatabaseEntry>,
}

impl DiffEntry {
    pub fn added(path: String, entry: DatabaseEntry) -> Self {
        DiffEntry {
            change_type: ChangeType::Add,
            old_path: None,
            new_path: Some(path),
            old_entry: None,
            new_entry: Some(entry),
        }
    }

    pub fn deleted(path: String, entry: DatabaseEntry) -> Self {
        DiffEntry {
            change_type: ChangeType::Delete,
            old_path: Some(path),
            new_path: None,
            old_entry: Some(entry),
            new_entry: None,
        }
    }

    pub fn modified(path: String, old: DatabaseEntry, new: DatabaseEntry) -> Self {
        DiffEntry {
            change_type: ChangeType::Modify,
            old_path: Some(path.clone()),
            new_path: Some(path),
            old_entry: Some(old),
            new_entry: Some(new),
        }
    }

    /// A rename or copy of `old_path` into `new_path`
    pub fn moved(
        change_type: ChangeType,
        old_path: String,
        old: DatabaseEntry,
        new_path: String,
        new: DatabaseEntry,
    ) -> Self {
        DiffEntry {
            change_type,
            old_path: Some(old_path),
            new_path: Some(new_path),
            old_entry: Some(old),
            new_entry: Some(new),
        }
    }

    pub fn change_type(&self) -> ChangeType {
        self.change_type
    }

    pub fn old_path(&self) -> Option<&str> {
        self.old_path.as_deref()
    }

    pub fn new_path(&self) -> Option<&str> {
        self.new_path.as_deref()
    }

    /// The path this change is reported under: the new path unless deleted
    pub fn path(&self) -> &str {
        self.new_path
            .as_deref()
            .or(self.old_path.as_deref())
            .unwrap_or_default()
    }

    pub fn old_entry(&self) -> Option<&DatabaseEntry> {
        self.old_entry.as_ref()
    }

    pub fn new_entry(&self) -> Option<&DatabaseEntry> {
        self.new_entry.as_ref()
    }

    pub fn old_blob_id(&self) -> Option<&ObjectId> {
        self.old_entry.as_ref().map(|entry| &entry.oid)
    }

    pub fn new_blob_id(&self) -> Option<&ObjectId> {
        self.new_entry.as_ref().map(|entry| &entry.oid)
    }
}

impl std::fmt::Display for DiffEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.change_type {
            ChangeType::Rename | ChangeType::Copy => write!(
                f,
                "{}\t{} -> {}",
                self.change_type.status_char(),
                self.old_path().unwrap_or_default(),
                self.path()
            ),
            _ => write!(f, "{}\t{}", self.change_type.status_char(), self.path()),
        }
    }
}
