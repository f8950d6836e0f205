//! Pack (`.pack`) entry decoding
//!
//! A pack starts with `PACK | version (2 or 3) | object count`, followed by entries.
//! Each entry begins with a variable-length header: bits 4-6 of the first byte hold
//! the type, the low 4 bits and the following 7-bit groups hold the inflated size.
//!
//! - types 1-4 (commit, tree, blob, tag) are followed by zlib-compressed content
//! - type 6 (`OFS_DELTA`) is followed by a negative offset to its base entry
//! - type 7 (`REF_DELTA`) is followed by the 20-byte id of its base object
//!
//! Delta entries are followed by a zlib-compressed delta instruction stream; chains
//! are resolved by the database, which can also find `REF_DELTA` bases elsewhere.

use crate::artifacts::database::pack_index::PackIndex;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Context;
use byteorder::{BigEndian, ReadBytesExt};
use bytes::Bytes;
use std::cell::RefCell;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

const PACK_SIGNATURE: &[u8; 4] = b"PACK";
const OFS_DELTA: u8 = 6;
const REF_DELTA: u8 = 7;

/// A decoded pack entry, before delta resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackEntry {
    Base(ObjectType, Bytes),
    OfsDelta { base_offset: u64, delta: Bytes },
    RefDelta { base_oid: ObjectId, delta: Bytes },
}

#[derive(Debug)]
pub struct PackFile {
    path: PathBuf,
    index: PackIndex,
    file: RefCell<File>,
    len: u64,
}

impl PackFile {
    /// Open `<name>.pack` next to the given `<name>.idx`
    pub fn open(index_path: &Path) -> anyhow::Result<Self> {
        let index_data = std::fs::read(index_path)
            .with_context(|| format!("Unable to read pack index {}", index_path.display()))?;
        let index = PackIndex::parse(&index_data)
            .with_context(|| format!("Invalid pack index {}", index_path.display()))?;

        let path = index_path.with_extension("pack");
        let mut file = File::open(&path)
            .with_context(|| format!("Unable to open pack {}", path.display()))?;

        let len = file.metadata()?.len();

        let mut signature = [0u8; 4];
        file.read_exact(&mut signature)?;
        if &signature != PACK_SIGNATURE {
            anyhow::bail!("{} is not a pack file", path.display());
        }
        let version = file.read_u32::<BigEndian>()?;
        if version != 2 && version != 3 {
            anyhow::bail!("unsupported pack version {version} in {}", path.display());
        }
        let count = file.read_u32::<BigEndian>()? as usize;
        if count != index.len() {
            anyhow::bail!(
                "pack {} holds {count} objects but its index lists {}",
                path.display(),
                index.len()
            );
        }

        Ok(PackFile {
            path,
            index,
            file: RefCell::new(file),
            len,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn find_offset(&self, oid: &ObjectId) -> Option<u64> {
        self.index.find_offset(oid)
    }

    /// Decode the entry starting at `offset`
    pub fn read_entry(&self, offset: u64) -> anyhow::Result<PackEntry> {
        let mut file = self.file.borrow_mut();
        file.seek(SeekFrom::Start(offset))?;
        let mut reader = BufReader::new(&mut *file);
        let remaining = self.len.saturating_sub(offset);

        let (type_code, size) = Self::read_entry_header(&mut reader)
            .with_context(|| format!("invalid entry header at offset {offset}"))?;

        match type_code {
            OFS_DELTA => {
                let distance = Self::read_base_distance(&mut reader)?;
                let base_offset = offset
                    .checked_sub(distance)
                    .with_context(|| format!("delta base before start of pack at {offset}"))?;
                let delta = Self::inflate(&mut reader, size, remaining)?;
                Ok(PackEntry::OfsDelta { base_offset, delta })
            }
            REF_DELTA => {
                let base_oid = ObjectId::read_h40_from(&mut reader)
                    .context("truncated delta base id")?;
                let delta = Self::inflate(&mut reader, size, remaining)?;
                Ok(PackEntry::RefDelta { base_oid, delta })
            }
            code => {
                let object_type = ObjectType::from_pack_code(code)
                    .with_context(|| format!("invalid pack entry type {code} at {offset}"))?;
                let content = Self::inflate(&mut reader, size, remaining)?;
                Ok(PackEntry::Base(object_type, content))
            }
        }
    }

    fn read_entry_header(reader: &mut impl Read) -> anyhow::Result<(u8, usize)> {
        let mut byte = reader.read_u8()?;
        let type_code = (byte >> 4) & 0x07;
        let mut size = (byte & 0x0f) as usize;
        let mut shift = 4u32;

        while byte & 0x80 != 0 {
            byte = reader.read_u8()?;
            if shift > usize::BITS - 7 {
                anyhow::bail!("entry size overflows");
            }
            size |= ((byte & 0x7f) as usize) << shift;
            shift += 7;
        }

        Ok((type_code, size))
    }

    /// Offset encoding of `OFS_DELTA`: big-endian 7-bit groups, each continuation
    /// adding one so that every distance has a single encoding
    fn read_base_distance(reader: &mut impl Read) -> anyhow::Result<u64> {
        let mut byte = reader.read_u8()?;
        let mut distance = (byte & 0x7f) as u64;

        while byte & 0x80 != 0 {
            byte = reader.read_u8()?;
            distance = distance
                .checked_add(1)
                .and_then(|d| d.checked_mul(128))
                .context("delta base distance overflows")?
                | (byte & 0x7f) as u64;
        }

        Ok(distance)
    }

    /// Inflate an entry declared as `size` bytes; the buffer only grows past the
    /// compressed bytes left in the pack as the stream actually produces output
    fn inflate(reader: &mut impl BufRead, size: usize, remaining: u64) -> anyhow::Result<Bytes> {
        let mut decoder = flate2::bufread::ZlibDecoder::new(reader);
        let mut content = Vec::with_capacity(size.min(remaining as usize));
        decoder
            .by_ref()
            .take(size as u64)
            .read_to_end(&mut content)
            .context("Unable to inflate pack entry")?;

        if content.len() != size {
            anyhow::bail!(
                "pack entry inflated to {} bytes, expected {size}",
                content.len()
            );
        }

        Ok(content.into())
    }
}
