//! Git blob object
//!
//! Blobs store file content in Git. They contain only the raw file data,
//! without any metadata like filename or permissions (those are stored in trees).
//! Content is kept as bytes: binary files are legitimate blobs.

use crate::artifacts::objects::object::{Object, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use bytes::Bytes;
use derive_new::new;
use std::io::{BufRead, Read};

/// Git blob object representing file content
#[derive(Debug, Clone, new)]
pub struct Blob {
    oid: ObjectId,
    content: Bytes,
}

impl Blob {
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn into_content(self) -> Bytes {
        self.content
    }
}

impl Unpackable for Blob {
    fn deserialize(oid: ObjectId, mut reader: impl BufRead) -> anyhow::Result<Self> {
        // the header has already been read
        let mut content = Vec::new();
        reader.read_to_end(&mut content)?;

        Ok(Self::new(oid, content.into()))
    }
}

impl Object for Blob {
    fn object_type(&self) -> ObjectType {
        ObjectType::Blob
    }

    fn object_id(&self) -> &ObjectId {
        &self.oid
    }
}
