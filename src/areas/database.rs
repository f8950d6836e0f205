use crate::artifacts::database::delta::apply_delta;
use crate::artifacts::database::pack_file::{PackEntry, PackFile};
use crate::artifacts::diff::tree_diff::TreeDiff;
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object::{ObjectBox, RawObject, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree::Tree;
use crate::errors::{ExtractError, Result};
use anyhow::Context;
use bytes::Bytes;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

/// Longest delta chain followed before the pack is considered corrupt
const MAX_DELTA_CHAIN: usize = 4096;
/// Resolved delta bases kept per handle
const DELTA_BASE_CACHE_SIZE: usize = 256;

/// Read-only view of a repository's object store
///
/// Objects are looked up in the packs first (where nearly everything lives in a
/// real repository), then as loose objects.
#[derive(Debug)]
pub struct Database {
    path: Box<Path>,
    packs: Vec<PackFile>,
    verify_objects: bool,
    delta_bases: RefCell<HashMap<(usize, u64), RawObject>>,
}

impl Database {
    pub fn open(path: Box<Path>, verify_objects: bool) -> Result<Self> {
        let packs = Self::open_packs(&path.join("pack"))?;
        tracing::debug!(
            objects = %path.display(),
            packs = packs.len(),
            "opened object database"
        );

        Ok(Database {
            path,
            packs,
            verify_objects,
            delta_bases: RefCell::new(HashMap::new()),
        })
    }

    fn open_packs(pack_dir: &Path) -> Result<Vec<PackFile>> {
        if !pack_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut index_paths = std::fs::read_dir(pack_dir)
            .map_err(|e| ExtractError::io(pack_dir, e))?
            .map(|entry| entry.map(|entry| entry.path()))
            .collect::<std::io::Result<Vec<PathBuf>>>()
            .map_err(|e| ExtractError::io(pack_dir, e))?
            .into_iter()
            .filter(|path| path.extension().is_some_and(|ext| ext == "idx"))
            .collect::<Vec<_>>();
        index_paths.sort();

        index_paths
            .iter()
            .map(|index_path| {
                PackFile::open(index_path)
                    .map_err(|e| ExtractError::corruption(index_path.display(), e))
            })
            .collect()
    }

    pub fn tree_diff(
        &self,
        old_oid: Option<&ObjectId>,
        new_oid: Option<&ObjectId>,
    ) -> Result<TreeDiff<'_>> {
        let mut tree_diff = TreeDiff::new(self);
        tree_diff.compare_oids(old_oid, new_oid, "")?;
        Ok(tree_diff)
    }

    /// Load the type and inflated content of an object
    pub fn load(&self, object_id: &ObjectId) -> Result<RawObject> {
        let raw = self
            .load_unverified(object_id)
            .map_err(|e| ExtractError::corruption(object_id, e))?;

        if self.verify_objects {
            let actual = raw.compute_id();
            if &actual != object_id {
                return Err(ExtractError::corruption(
                    object_id,
                    anyhow::anyhow!("content hashes to {actual}"),
                ));
            }
        }

        Ok(raw)
    }

    fn load_unverified(&self, object_id: &ObjectId) -> anyhow::Result<RawObject> {
        for (pack_idx, pack) in self.packs.iter().enumerate() {
            if let Some(offset) = pack.find_offset(object_id) {
                return self.read_packed(pack_idx, offset);
            }
        }

        let object_path = self.path.join(object_id.to_path());
        if object_path.exists() {
            return self.read_loose(&object_path);
        }

        Err(anyhow::anyhow!("object not found"))
    }

    fn read_loose(&self, object_path: &Path) -> anyhow::Result<RawObject> {
        let object_content = std::fs::read(object_path).context(format!(
            "Unable to read object file {}",
            object_path.display()
        ))?;

        let object_content = Self::decompress(object_content.into())?;
        let mut object_reader = Cursor::new(object_content);
        let (object_type, size) = ObjectType::parse_object_header(&mut object_reader)?;

        let header_len = object_reader.position() as usize;
        let content = object_reader.into_inner().slice(header_len..);
        if content.len() != size {
            anyhow::bail!(
                "object declares {size} bytes but holds {}",
                content.len()
            );
        }

        Ok(RawObject::new(object_type, content))
    }

    /// Resolve the entry at `offset`, following its delta chain down to a base object
    fn read_packed(&self, pack_idx: usize, offset: u64) -> anyhow::Result<RawObject> {
        let mut deltas = Vec::new();
        let mut cursor = (pack_idx, offset);

        let mut base = loop {
            if let Some(cached) = self.delta_bases.borrow().get(&cursor) {
                break cached.clone();
            }

            if deltas.len() > MAX_DELTA_CHAIN {
                anyhow::bail!("delta chain longer than {MAX_DELTA_CHAIN}");
            }

            let (current_pack, current_offset) = cursor;
            let pack = &self.packs[current_pack];
            match pack.read_entry(current_offset).with_context(|| {
                format!("in pack {} at offset {current_offset}", pack.path().display())
            })? {
                PackEntry::Base(object_type, content) => {
                    break RawObject::new(object_type, content);
                }
                PackEntry::OfsDelta { base_offset, delta } => {
                    deltas.push((cursor, delta));
                    cursor = (current_pack, base_offset);
                }
                PackEntry::RefDelta { base_oid, delta } => {
                    deltas.push((cursor, delta));
                    match self.locate_packed(&base_oid) {
                        Some(location) => cursor = location,
                        None => break self.load_unverified(&base_oid)?,
                    }
                }
            }
        };

        while let Some((location, delta)) = deltas.pop() {
            let content = apply_delta(&base.content, &delta)
                .with_context(|| format!("applying delta at offset {}", location.1))?;
            base = RawObject::new(base.object_type, Bytes::from(content));

            // only intermediate results serve as bases for other entries
            if !deltas.is_empty() {
                self.cache_delta_base(location, &base);
            }
        }

        Ok(base)
    }

    fn locate_packed(&self, object_id: &ObjectId) -> Option<(usize, u64)> {
        self.packs
            .iter()
            .enumerate()
            .find_map(|(pack_idx, pack)| pack.find_offset(object_id).map(|o| (pack_idx, o)))
    }

    fn cache_delta_base(&self, location: (usize, u64), object: &RawObject) {
        let mut cache = self.delta_bases.borrow_mut();
        if cache.len() >= DELTA_BASE_CACHE_SIZE {
            cache.clear();
        }
        cache.insert(location, object.clone());
    }

    pub fn parse_object(&self, object_id: &ObjectId) -> Result<ObjectBox> {
        let raw = self.load(object_id)?;
        let oid = object_id.clone();
        let reader = Cursor::new(raw.content);

        let parsed = match raw.object_type {
            ObjectType::Blob => Blob::deserialize(oid, reader).map(|b| ObjectBox::Blob(Box::new(b))),
            ObjectType::Tree => Tree::deserialize(oid, reader).map(|t| ObjectBox::Tree(Box::new(t))),
            ObjectType::Commit => {
                Commit::deserialize(oid, reader).map(|c| ObjectBox::Commit(Box::new(c)))
            }
            ObjectType::Tag => Err(anyhow::anyhow!("unexpected object type tag")),
        };

        parsed.map_err(|e| ExtractError::corruption(object_id, e))
    }

    pub fn parse_object_as_blob(&self, object_id: &ObjectId) -> Result<Blob> {
        match self.parse_object(object_id)? {
            ObjectBox::Blob(blob) => Ok(*blob),
            other => Err(Self::unexpected_type(object_id, ObjectType::Blob, &other)),
        }
    }

    pub fn parse_object_as_commit(&self, object_id: &ObjectId) -> Result<Commit> {
        match self.parse_object(object_id)? {
            ObjectBox::Commit(commit) => Ok(*commit),
            other => Err(Self::unexpected_type(object_id, ObjectType::Commit, &other)),
        }
    }

    /// Content of a blob, without parsing it any further
    pub fn load_blob_content(&self, object_id: &ObjectId) -> Result<Bytes> {
        Ok(self.parse_object_as_blob(object_id)?.into_content())
    }

    fn unexpected_type(object_id: &ObjectId, expected: ObjectType, found: &ObjectBox) -> ExtractError {
        ExtractError::corruption(
            object_id,
            anyhow::anyhow!(
                "unexpected object type: expected {expected}, found {}",
                found.object_type()
            ),
        )
    }

    fn decompress(data: Bytes) -> anyhow::Result<Bytes> {
        let mut decoder = flate2::read::ZlibDecoder::new(&*data);
        let mut decompressed_content = Vec::new();
        decoder
            .read_to_end(&mut decompressed_content)
            .context("Unable to decompress object content")?;

        Ok(decompressed_content.into())
    }
}
