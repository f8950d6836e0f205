//! Pack index (`.idx`) lookup tables
//!
//! ## Version 2 layout
//!
//! ```text
//! \377tOc | version (2) | fanout[256] | names[N] (20 bytes each)
//!   | crc32[N] | offset32[N] | offset64[M] | pack checksum | index checksum
//! ```
//!
//! Offsets with the most significant bit set index into the 64-bit offset table.
//!
//! ## Version 1 layout
//!
//! ```text
//! fanout[256] | (offset32, name)[N] | pack checksum | index checksum
//! ```
//!
//! In both versions `fanout[b]` is the number of objects whose first byte is `<= b`,
//! so the names starting with `b` occupy `fanout[b - 1]..fanout[b]`.

use crate::artifacts::objects::RAW_OBJECT_ID_LENGTH;
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Cursor, Read};

const IDX_V2_MAGIC: [u8; 4] = [0xff, b't', b'O', b'c'];
const FANOUT_ENTRIES: usize = 256;
const LARGE_OFFSET_FLAG: u32 = 0x8000_0000;
/// name + crc32 + offset32 per object in a v2 index
const V2_ENTRY_LEN: usize = RAW_OBJECT_ID_LENGTH + 4 + 4;
/// offset32 + name per object in a v1 index
const V1_ENTRY_LEN: usize = 4 + RAW_OBJECT_ID_LENGTH;

type RawId = [u8; RAW_OBJECT_ID_LENGTH];

#[derive(Debug, Clone)]
pub struct PackIndex {
    fanout: Vec<u32>,
    names: Vec<RawId>,
    offsets: Vec<u64>,
}

impl PackIndex {
    pub fn parse(data: &[u8]) -> anyhow::Result<Self> {
        if data.starts_with(&IDX_V2_MAGIC) {
            Self::parse_v2(data)
        } else {
            Self::parse_v1(data)
        }
    }

    fn read_fanout(reader: &mut Cursor<&[u8]>) -> anyhow::Result<Vec<u32>> {
        let mut fanout = Vec::with_capacity(FANOUT_ENTRIES);
        for _ in 0..FANOUT_ENTRIES {
            fanout.push(
                reader
                    .read_u32::<BigEndian>()
                    .context("truncated fanout table")?,
            );
        }

        if fanout.windows(2).any(|pair| pair[0] > pair[1]) {
            anyhow::bail!("fanout table is not monotonic");
        }

        Ok(fanout)
    }

    /// Object count from the fanout, checked against the bytes left to hold its entries
    fn entry_count(
        fanout: &[u32],
        reader: &Cursor<&[u8]>,
        entry_len: usize,
    ) -> anyhow::Result<usize> {
        let count = fanout[FANOUT_ENTRIES - 1] as usize;
        let available = (reader.get_ref().len() as u64).saturating_sub(reader.position());
        let needed = (count as u64).saturating_mul(entry_len as u64);
        if needed > available {
            anyhow::bail!(
                "fanout lists {count} objects but only {available} bytes of entries remain"
            );
        }

        Ok(count)
    }

    fn parse_v2(data: &[u8]) -> anyhow::Result<Self> {
        let mut reader = Cursor::new(data);
        reader.set_position(IDX_V2_MAGIC.len() as u64);

        let version = reader.read_u32::<BigEndian>()?;
        if version != 2 {
            anyhow::bail!("unsupported pack index version {version}");
        }

        let fanout = Self::read_fanout(&mut reader)?;
        let count = Self::entry_count(&fanout, &reader, V2_ENTRY_LEN)?;

        let mut names = Vec::with_capacity(count);
        for _ in 0..count {
            let mut name = [0u8; RAW_OBJECT_ID_LENGTH];
            reader
                .read_exact(&mut name)
                .context("truncated object name table")?;
            names.push(name);
        }

        // CRC32 table is only needed when copying raw entries between packs
        reader.set_position(reader.position() + 4 * count as u64);

        let mut small_offsets = Vec::with_capacity(count);
        for _ in 0..count {
            small_offsets.push(
                reader
                    .read_u32::<BigEndian>()
                    .context("truncated offset table")?,
            );
        }

        let large_table_start = reader.position();
        let offsets = small_offsets
            .into_iter()
            .map(|offset| {
                if offset & LARGE_OFFSET_FLAG == 0 {
                    return Ok(offset as u64);
                }

                let slot = (offset & !LARGE_OFFSET_FLAG) as u64;
                reader.set_position(large_table_start + 8 * slot);
                reader
                    .read_u64::<BigEndian>()
                    .context("truncated large offset table")
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(PackIndex {
            fanout,
            names,
            offsets,
        })
    }

    fn parse_v1(data: &[u8]) -> anyhow::Result<Self> {
        let mut reader = Cursor::new(data);

        let fanout = Self::read_fanout(&mut reader)?;
        let count = Self::entry_count(&fanout, &reader, V1_ENTRY_LEN)?;

        let mut names = Vec::with_capacity(count);
        let mut offsets = Vec::with_capacity(count);
        for _ in 0..count {
            offsets.push(
                reader
                    .read_u32::<BigEndian>()
                    .context("truncated index entry")? as u64,
            );
            let mut name = [0u8; RAW_OBJECT_ID_LENGTH];
            reader
                .read_exact(&mut name)
                .context("truncated index entry")?;
            names.push(name);
        }

        Ok(PackIndex {
            fanout,
            names,
            offsets,
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Offset of `oid` inside the companion pack, if the pack contains it
    pub fn find_offset(&self, oid: &ObjectId) -> Option<u64> {
        self.find_raw_offset(&oid.to_raw())
    }

    pub fn find_raw_offset(&self, raw: &RawId) -> Option<u64> {
        let first = raw[0] as usize;
        let start = if first == 0 {
            0
        } else {
            self.fanout[first - 1] as usize
        };
        let end = self.fanout[first] as usize;

        let bucket = self.names.get(start..end)?;
        bucket
            .binary_search(raw)
            .ok()
            .map(|position| self.offsets[start + position])
    }
}
