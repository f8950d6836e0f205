use crate::artifacts::objects::RAW_OBJECT_ID_LENGTH;
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree::Tree;
use anyhow::Result;
use bytes::Bytes;
use derive_new::new;
use sha1::{Digest, Sha1};
use std::io::BufRead;

pub trait Unpackable {
    /// Parse the object content (header already stripped) stored under `oid`
    fn deserialize(oid: ObjectId, reader: impl BufRead) -> Result<Self>
    where
        Self: Sized;
}

pub trait Object {
    fn object_type(&self) -> ObjectType;

    fn object_id(&self) -> &ObjectId;
}

/// An object as stored: its type and inflated content, without the header
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct RawObject {
    pub object_type: ObjectType,
    pub content: Bytes,
}

impl RawObject {
    /// Hash the object the way git names it: `sha1("<type> <size>\0<content>")`
    pub fn compute_id(&self) -> ObjectId {
        let mut hasher = Sha1::new();
        hasher.update(format!("{} {}\0", self.object_type, self.content.len()).as_bytes());
        hasher.update(&self.content);

        let mut raw = [0u8; RAW_OBJECT_ID_LENGTH];
        raw.copy_from_slice(&hasher.finalize());

        ObjectId::from_raw(&raw)
    }
}

pub enum ObjectBox {
    Blob(Box<Blob>),
    Tree(Box<Tree>),
    Commit(Box<Commit>),
}

impl ObjectBox {
    pub fn object_type(&self) -> ObjectType {
        match self {
            ObjectBox::Blob(blob) => blob.object_type(),
            ObjectBox::Tree(tree) => tree.object_type(),
            ObjectBox::Commit(commit) => commit.object_type(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_blob_hashes_to_the_well_known_id() {
        let raw = RawObject::new(ObjectType::Blob, Bytes::new());

        assert_eq!(
            raw.compute_id().as_ref(),
            "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391"
        );
    }

    #[test]
    fn empty_tree_hashes_to_the_well_known_id() {
        let raw = RawObject::new(ObjectType::Tree, Bytes::new());

        assert_eq!(
            raw.compute_id().as_ref(),
            "4b825dc642cb6eb9a060e54bf8d69288fbee4904"
        );
    }
}
