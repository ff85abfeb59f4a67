use crate::common::fixture::{RepoBuilder, hash_object, zlib};
use bitlist::artifacts::objects::object_id::ObjectId;
use sha1::{Digest, Sha1};

const OBJ_OFS_DELTA: u8 = 6;
const OBJ_REF_DELTA: u8 = 7;

/// One entry of a pack under construction
#[derive(Debug, Clone)]
pub enum PackInput {
    Whole { kind: &'static str, payload: Vec<u8> },
    /// Delta against an earlier entry of the same pack, by position
    OfsDelta { base: usize, target: Vec<u8> },
    /// Delta against an object named by id, possibly outside the pack
    RefDelta {
        base: ObjectId,
        kind: &'static str,
        base_payload: Vec<u8>,
        target: Vec<u8>,
    },
    /// Whole object whose entry header claims `declared` bytes
    Forged {
        kind: &'static str,
        declared: usize,
        payload: Vec<u8>,
    },
}

fn type_code(kind: &str) -> u8 {
    match kind {
        "commit" => 1,
        "tree" => 2,
        "blob" => 3,
        "tag" => 4,
        other => panic!("unknown object type {other}"),
    }
}

fn size_varint(mut value: usize) -> Vec<u8> {
    let mut bytes = Vec::new();
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            bytes.push(byte);
            return bytes;
        }
        bytes.push(byte | 0x80);
    }
}

fn entry_header(code: u8, size: usize) -> Vec<u8> {
    let mut first = (code << 4) | (size & 0x0f) as u8;
    let mut rest = size >> 4;
    let mut bytes = Vec::new();
    if rest > 0 {
        first |= 0x80;
    }
    bytes.push(first);
    while rest > 0 {
        let byte = (rest & 0x7f) as u8;
        rest >>= 7;
        bytes.push(if rest > 0 { byte | 0x80 } else { byte });
    }
    bytes
}

fn ofs_encoding(mut distance: u64) -> Vec<u8> {
    let mut bytes = vec![(distance & 0x7f) as u8];
    distance >>= 7;
    while distance > 0 {
        distance -= 1;
        bytes.push(0x80 | (distance & 0x7f) as u8);
        distance >>= 7;
    }
    bytes.reverse();
    bytes
}

/// Delta turning `base` into `target`: copy the common prefix, insert the rest
pub fn make_delta(base: &[u8], target: &[u8]) -> Vec<u8> {
    let mut delta = size_varint(base.len());
    delta.extend(size_varint(target.len()));

    let common = base
        .iter()
        .zip(target)
        .take_while(|(a, b)| a == b)
        .count()
        .min(0xff_ffff);
    if common > 0 {
        // copy from offset 0; three size bytes
        delta.push(0x80 | 0x10 | 0x20 | 0x40);
        delta.push((common & 0xff) as u8);
        delta.push(((common >> 8) & 0xff) as u8);
        delta.push(((common >> 16) & 0xff) as u8);
    }
    for chunk in target[common..].chunks(0x7f) {
        delta.push(chunk.len() as u8);
        delta.extend_from_slice(chunk);
    }
    delta
}

/// Write `pack-<name>.pack` and a version 2 index; returns the ids in input order
pub fn write_pack(repo: &RepoBuilder, name: &str, inputs: &[PackInput]) -> Vec<ObjectId> {
    let mut pack = b"PACK".to_vec();
    pack.extend(2u32.to_be_bytes());
    pack.extend((inputs.len() as u32).to_be_bytes());

    let mut offsets = Vec::new();
    let mut resolved: Vec<(&'static str, Vec<u8>)> = Vec::new();
    let mut ids = Vec::new();

    for input in inputs {
        let offset = pack.len() as u64;
        let (kind, payload) = match input {
            PackInput::Whole { kind, payload } => {
                pack.extend(entry_header(type_code(kind), payload.len()));
                pack.extend(zlib(payload));
                (*kind, payload.clone())
            }
            PackInput::OfsDelta { base, target } => {
                let (kind, base_payload) = resolved[*base].clone();
                let delta = make_delta(&base_payload, target);
                pack.extend(entry_header(OBJ_OFS_DELTA, delta.len()));
                pack.extend(ofs_encoding(offset - offsets[*base]));
                pack.extend(zlib(&delta));
                (kind, target.clone())
            }
            PackInput::RefDelta {
                base,
                kind,
                base_payload,
                target,
            } => {
                let delta = make_delta(base_payload, target);
                pack.extend(entry_header(OBJ_REF_DELTA, delta.len()));
                pack.extend_from_slice(base.as_bytes());
                pack.extend(zlib(&delta));
                (*kind, target.clone())
            }
            PackInput::Forged {
                kind,
                declared,
                payload,
            } => {
                pack.extend(entry_header(type_code(kind), *declared));
                pack.extend(zlib(payload));
                (*kind, payload.clone())
            }
        };

        ids.push(hash_object(kind, &payload));
        offsets.push(offset);
        resolved.push((kind, payload));
    }

    let pack_checksum: [u8; 20] = Sha1::digest(&pack).into();
    pack.extend_from_slice(&pack_checksum);

    let mut sorted = ids.iter().copied().zip(offsets.iter().copied()).collect::<Vec<_>>();
    sorted.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

    let mut index = b"\xfftOc".to_vec();
    index.extend(2u32.to_be_bytes());
    for byte in 0..=255u8 {
        let count = sorted.iter().filter(|(oid, _)| oid.as_bytes()[0] <= byte).count();
        index.extend((count as u32).to_be_bytes());
    }
    for (oid, _) in &sorted {
        index.extend_from_slice(oid.as_bytes());
    }
    for _ in &sorted {
        index.extend(0u32.to_be_bytes());
    }
    for (_, offset) in &sorted {
        index.extend((*offset as u32).to_be_bytes());
    }
    index.extend_from_slice(&pack_checksum);
    let index_checksum: [u8; 20] = Sha1::digest(&index).into();
    index.extend_from_slice(&index_checksum);

    let pack_dir = repo.objects_dir().join("pack");
    std::fs::create_dir_all(&pack_dir).expect("failed to create pack dir");
    std::fs::write(pack_dir.join(format!("pack-{name}.pack")), pack).expect("failed to write pack");
    std::fs::write(pack_dir.join(format!("pack-{name}.idx")), index).expect("failed to write idx");

    ids
}
