//! Pack and version 2 index writer
//!
//! Entries are written in insertion order, so an `OFS_DELTA` may only refer to an
//! earlier entry. `REF_DELTA` bases may live anywhere, including outside the pack.

use crate::common::repo::{TestRepo, compress, from_hex, object_id, to_hex};
use sha1::{Digest, Sha1};

const OFS_DELTA: u8 = 6;
const REF_DELTA: u8 = 7;
const MAX_INSERT: usize = 0x7f;

enum Encoding {
    Full,
    OfsDelta { base: usize },
    RawOfsDelta { base: usize, delta: Vec<u8> },
    RefDelta { base_oid: String, base_body: Vec<u8> },
}

struct PackedObject {
    oid: String,
    kind: &'static str,
    body: Vec<u8>,
    encoding: Encoding,
}

#[derive(Default)]
pub struct PackBuilder {
    objects: Vec<PackedObject>,
}

impl PackBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, kind: &'static str, body: Vec<u8>, encoding: Encoding) -> usize {
        self.objects.push(PackedObject {
            oid: object_id(kind, &body),
            kind,
            body,
            encoding,
        });
        self.objects.len() - 1
    }

    /// Undeltified entry; returns its position for later `OFS_DELTA` entries
    pub fn add(&mut self, kind: &'static str, body: impl Into<Vec<u8>>) -> usize {
        self.push(kind, body.into(), Encoding::Full)
    }

    /// Entry stored as a delta against the entry at position `base`
    pub fn add_ofs_delta(&mut self, base: usize, body: impl Into<Vec<u8>>) -> usize {
        let kind = self.objects[base].kind;
        self.push(kind, body.into(), Encoding::OfsDelta { base })
    }

    /// Entry claiming to be `body`, stored as the given instruction stream against `base`
    pub fn add_raw_ofs_delta(
        &mut self,
        base: usize,
        body: impl Into<Vec<u8>>,
        delta: Vec<u8>,
    ) -> usize {
        let kind = self.objects[base].kind;
        self.push(kind, body.into(), Encoding::RawOfsDelta { base, delta })
    }

    /// Entry stored as a delta against the object `base_kind`/`base_body`, by id
    pub fn add_ref_delta(
        &mut self,
        base_kind: &'static str,
        base_body: &[u8],
        body: impl Into<Vec<u8>>,
    ) -> usize {
        let base_oid = object_id(base_kind, base_body);
        self.push(
            base_kind,
            body.into(),
            Encoding::RefDelta {
                base_oid,
                base_body: base_body.to_vec(),
            },
        )
    }

    pub fn oid(&self, position: usize) -> String {
        self.objects[position].oid.clone()
    }

    /// Write `pack-<checksum>.pack` and its `.idx`; returns the pack path
    pub fn write(&self, repo: &TestRepo) -> std::path::PathBuf {
        let (pack, offsets) = self.encode_pack();
        let checksum = pack[pack.len() - 20..].to_vec();
        let index = self.encode_index(&offsets, &checksum);

        let pack_dir = repo.git_dir().join("objects").join("pack");
        let name = format!("pack-{}", to_hex(&checksum));
        let pack_path = pack_dir.join(format!("{name}.pack"));
        std::fs::write(&pack_path, pack).expect("pack file");
        std::fs::write(pack_dir.join(format!("{name}.idx")), index).expect("index file");

        pack_path
    }

    fn encode_pack(&self) -> (Vec<u8>, Vec<u64>) {
        let mut pack = b"PACK".to_vec();
        pack.extend_from_slice(&2u32.to_be_bytes());
        pack.extend_from_slice(&(self.objects.len() as u32).to_be_bytes());

        let mut offsets: Vec<u64> = Vec::with_capacity(self.objects.len());
        for object in &self.objects {
            let offset = pack.len() as u64;

            match &object.encoding {
                Encoding::Full => {
                    pack.extend(entry_header(type_code(object.kind), object.body.len()));
                    pack.extend(compress(&object.body));
                }
                Encoding::OfsDelta { base } => {
                    let delta = make_delta(&self.objects[*base].body, &object.body);
                    pack.extend(entry_header(OFS_DELTA, delta.len()));
                    pack.extend(base_distance(offset - offsets[*base]));
                    pack.extend(compress(&delta));
                }
                Encoding::RawOfsDelta { base, delta } => {
                    pack.extend(entry_header(OFS_DELTA, delta.len()));
                    pack.extend(base_distance(offset - offsets[*base]));
                    pack.extend(compress(delta));
                }
                Encoding::RefDelta {
                    base_oid,
                    base_body,
                } => {
                    let delta = make_delta(base_body, &object.body);
                    pack.extend(entry_header(REF_DELTA, delta.len()));
                    pack.extend(from_hex(base_oid));
                    pack.extend(compress(&delta));
                }
            }

            offsets.push(offset);
        }

        let checksum = Sha1::digest(&pack);
        pack.extend_from_slice(&checksum);
        (pack, offsets)
    }

    fn encode_index(&self, offsets: &[u64], pack_checksum: &[u8]) -> Vec<u8> {
        let mut entries = self
            .objects
            .iter()
            .zip(offsets)
            .map(|(object, offset)| (from_hex(&object.oid), *offset))
            .collect::<Vec<_>>();
        entries.sort();

        let mut index = vec![0xff, b't', b'O', b'c'];
        index.extend_from_slice(&2u32.to_be_bytes());
        for byte in 0..=255u8 {
            let count = entries.iter().filter(|(name, _)| name[0] <= byte).count();
            index.extend_from_slice(&(count as u32).to_be_bytes());
        }
        for (name, _) in &entries {
            index.extend_from_slice(name);
        }
        for _ in &entries {
            index.extend_from_slice(&0u32.to_be_bytes());
        }
        for (_, offset) in &entries {
            index.extend_from_slice(&(*offset as u32).to_be_bytes());
        }
        index.extend_from_slice(pack_checksum);

        let checksum = Sha1::digest(&index);
        index.extend_from_slice(&checksum);
        index
    }
}

fn type_code(kind: &str) -> u8 {
    match kind {
        "commit" => 1,
        "tree" => 2,
        "blob" => 3,
        "tag" => 4,
        other => panic!("no pack type for {other}"),
    }
}

fn entry_header(type_code: u8, size: usize) -> Vec<u8> {
    let mut header = vec![(type_code << 4) | (size & 0x0f) as u8];
    let mut rest = size >> 4;

    while rest > 0 {
        if let Some(last) = header.last_mut() {
            *last |= 0x80;
        }
        header.push((rest & 0x7f) as u8);
        rest >>= 7;
    }

    header
}

/// Big-endian groups where every continuation stands for one extra unit
fn base_distance(mut distance: u64) -> Vec<u8> {
    let mut encoded = vec![(distance & 0x7f) as u8];
    distance >>= 7;

    while distance > 0 {
        distance -= 1;
        encoded.push(0x80 | (distance & 0x7f) as u8);
        distance >>= 7;
    }

    encoded.reverse();
    encoded
}

pub fn delta_size(mut size: usize) -> Vec<u8> {
    let mut encoded = Vec::new();
    loop {
        let byte = (size & 0x7f) as u8;
        size >>= 7;
        if size == 0 {
            encoded.push(byte);
            return encoded;
        }
        encoded.push(byte | 0x80);
    }
}

fn copy_instruction(offset: usize, size: usize) -> Vec<u8> {
    let mut opcode = 0x80u8;
    let mut operands = Vec::new();

    for i in 0..4 {
        let byte = (offset >> (8 * i)) & 0xff;
        if byte != 0 {
            opcode |= 1 << i;
            operands.push(byte as u8);
        }
    }
    for i in 0..3 {
        let byte = (size >> (8 * i)) & 0xff;
        if byte != 0 {
            opcode |= 0x10 << i;
            operands.push(byte as u8);
        }
    }

    let mut instruction = vec![opcode];
    instruction.extend(operands);
    instruction
}

/// Copy the common prefix and suffix from `base`, insert everything in between
pub fn make_delta(base: &[u8], target: &[u8]) -> Vec<u8> {
    let prefix = base
        .iter()
        .zip(target)
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = base[prefix..]
        .iter()
        .rev()
        .zip(target[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let mut delta = delta_size(base.len());
    delta.extend(delta_size(target.len()));

    if prefix > 0 {
        delta.extend(copy_instruction(0, prefix));
    }
    for chunk in target[prefix..target.len() - suffix].chunks(MAX_INSERT) {
        delta.push(chunk.len() as u8);
        delta.extend_from_slice(chunk);
    }
    if suffix > 0 {
        delta.extend(copy_instruction(base.len() - suffix, suffix));
    }

    delta
}
