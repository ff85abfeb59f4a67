//! Pack files and their indexes
//!
//! A pack is a single file holding many zlib-compressed objects, some of them
//! stored as deltas against another object. The companion `.idx` file maps
//! object ids to byte offsets inside the pack.
//!
//! ## Index layout (version 2)
//!
//! ```text
//! \377tOc | version(4) | fanout(256 * 4) | ids(N * 20) | crc32(N * 4)
//!         | offsets(N * 4) | large offsets(M * 8) | pack checksum | idx checksum
//! ```
//!
//! Version 1 indexes have no magic: `fanout(256 * 4)` followed by N records of
//! `offset(4) id(20)`.
//!
//! ## Entry layout
//!
//! Each entry starts with a varint header carrying the type in bits 4-6 of the
//! first byte and the inflated size in the remaining bits. `OFS_DELTA` entries
//! follow it with a negative offset to their base, `REF_DELTA` entries with the
//! base's 20-byte id. The zlib stream comes next.

use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::OBJECT_ID_RAW_LENGTH;
use crate::errors::{Error, IoResultExt, Result};
use byteorder::{BigEndian, ByteOrder};
use flate2::read::ZlibDecoder;
use memmap2::Mmap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const IDX_V2_MAGIC: &[u8; 4] = b"\xfftOc";
const FANOUT_ENTRIES: usize = 256;
const FANOUT_SIZE: usize = FANOUT_ENTRIES * 4;
const PACK_SIGNATURE: &[u8; 4] = b"PACK";
const PACK_HEADER_SIZE: usize = 12;

const OBJ_OFS_DELTA: u8 = 6;
const OBJ_REF_DELTA: u8 = 7;

/// Most bytes reserved up front for a size read out of object data
const MAX_PREALLOCATION: usize = 16 << 20;

/// Empty buffer sized for `declared` bytes. Declared sizes come from object
/// headers, so the reservation is capped and the buffer grows with real data.
pub(crate) fn buffer_for(declared: u64) -> Vec<u8> {
    let capacity = usize::try_from(declared).map_or(MAX_PREALLOCATION, |size| {
        size.min(MAX_PREALLOCATION)
    });
    Vec::with_capacity(capacity)
}

fn map_file(path: &Path) -> Result<Mmap> {
    let file = File::open(path).with_path(path)?;
    // SAFETY: pack and index files are immutable once written; git replaces
    // them through rename and never rewrites them in place.
    unsafe { Mmap::map(&file) }.with_path(path)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndexVersion {
    V1,
    V2,
}

/// Memory-mapped `.idx` file
pub struct PackIndex {
    path: PathBuf,
    data: Mmap,
    version: IndexVersion,
    count: usize,
}

impl std::fmt::Debug for PackIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackIndex")
            .field("path", &self.path)
            .field("version", &self.version)
            .field("count", &self.count)
            .finish()
    }
}

impl PackIndex {
    pub fn open(path: &Path) -> Result<Self> {
        let data = map_file(path)?;
        let corrupt = |reason: &str| Error::corrupt(path.display(), reason.to_string());

        let (version, fanout_start) = if data.len() >= 8 && &data[..4] == IDX_V2_MAGIC {
            match BigEndian::read_u32(&data[4..8]) {
                2 => (IndexVersion::V2, 8),
                other => return Err(corrupt(&format!("unsupported index version {other}"))),
            }
        } else {
            (IndexVersion::V1, 0)
        };

        if data.len() < fanout_start + FANOUT_SIZE {
            return Err(corrupt("truncated fanout table"));
        }
        let count = BigEndian::read_u32(&data[fanout_start + FANOUT_SIZE - 4..]) as usize;

        let index = PackIndex {
            path: path.to_path_buf(),
            data,
            version,
            count,
        };

        let minimum = match version {
            IndexVersion::V1 => FANOUT_SIZE + count * (4 + OBJECT_ID_RAW_LENGTH),
            IndexVersion::V2 => index.offsets_start() + count * 4,
        };
        if index.data.len() < minimum {
            return Err(corrupt("index shorter than its object count"));
        }

        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn fanout_start(&self) -> usize {
        match self.version {
            IndexVersion::V1 => 0,
            IndexVersion::V2 => 8,
        }
    }

    /// Number of ids whose first byte is `<= byte`
    fn fanout(&self, byte: usize) -> usize {
        let start = self.fanout_start() + byte * 4;
        BigEndian::read_u32(&self.data[start..start + 4]) as usize
    }

    fn ids_start(&self) -> usize {
        self.fanout_start() + FANOUT_SIZE
    }

    fn offsets_start(&self) -> usize {
        // ids, then one crc32 per object
        self.ids_start() + self.count * (OBJECT_ID_RAW_LENGTH + 4)
    }

    fn id_bytes_at(&self, position: usize) -> &[u8] {
        let start = match self.version {
            IndexVersion::V1 => FANOUT_SIZE + position * (4 + OBJECT_ID_RAW_LENGTH) + 4,
            IndexVersion::V2 => self.ids_start() + position * OBJECT_ID_RAW_LENGTH,
        };
        &self.data[start..start + OBJECT_ID_RAW_LENGTH]
    }

    fn id_at(&self, position: usize) -> Option<ObjectId> {
        ObjectId::try_from_slice(self.id_bytes_at(position))
    }

    fn offset_at(&self, position: usize) -> Result<u64> {
        match self.version {
            IndexVersion::V1 => {
                let start = FANOUT_SIZE + position * (4 + OBJECT_ID_RAW_LENGTH);
                Ok(BigEndian::read_u32(&self.data[start..start + 4]) as u64)
            }
            IndexVersion::V2 => {
                let start = self.offsets_start() + position * 4;
                let offset = BigEndian::read_u32(&self.data[start..start + 4]);
                if offset & 0x8000_0000 == 0 {
                    return Ok(offset as u64);
                }

                // MSB set: the low bits index the 64-bit offset table
                let large = self.offsets_start()
                    + self.count * 4
                    + (offset & 0x7fff_ffff) as usize * 8;
                if self.data.len() < large + 8 {
                    return Err(Error::corrupt(
                        self.path.display(),
                        "large offset outside the index",
                    ));
                }
                Ok(BigEndian::read_u64(&self.data[large..large + 8]))
            }
        }
    }

    /// Range of positions whose ids start with `first_byte`
    fn bucket(&self, first_byte: u8) -> std::ops::Range<usize> {
        let end = self.fanout(first_byte as usize).min(self.count);
        let start = match first_byte {
            0 => 0,
            byte => self.fanout(byte as usize - 1),
        };
        start.min(end)..end
    }

    /// Pack offset of `oid`, if this index lists it
    pub fn lookup(&self, oid: &ObjectId) -> Result<Option<u64>> {
        let target = oid.as_bytes().as_slice();
        let mut range = self.bucket(target[0]);

        while range.start < range.end {
            let middle = range.start + (range.end - range.start) / 2;
            match self.id_bytes_at(middle).cmp(target) {
                std::cmp::Ordering::Equal => return self.offset_at(middle).map(Some),
                std::cmp::Ordering::Less => range.start = middle + 1,
                std::cmp::Ordering::Greater => range.end = middle,
            }
        }

        Ok(None)
    }

    /// Every id in the index that starts with the hexadecimal `prefix`
    pub fn find_by_prefix(&self, prefix: &str) -> Vec<ObjectId> {
        let range = match prefix.get(..2).and_then(|b| u8::from_str_radix(b, 16).ok()) {
            Some(first_byte) => self.bucket(first_byte),
            None => 0..self.count,
        };

        range
            .filter_map(|position| self.id_at(position))
            .filter(|oid| oid.starts_with_hex(prefix))
            .collect()
    }
}

/// What a pack entry holds before any delta is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackEntryKind {
    Base(ObjectType),
    /// Delta against the entry at this absolute offset of the same pack
    OfsDelta(u64),
    /// Delta against an object named by id, possibly outside this pack
    RefDelta(ObjectId),
}

#[derive(Debug, Clone, Copy)]
pub struct PackEntryHeader {
    pub kind: PackEntryKind,
    /// Inflated size of the entry's own data (the delta payload for deltas)
    pub size: u64,
    data_offset: usize,
}

/// Memory-mapped `.pack` file with its index
pub struct Pack {
    path: PathBuf,
    index: PackIndex,
    data: Arc<Mmap>,
}

impl std::fmt::Debug for Pack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pack")
            .field("path", &self.path)
            .field("objects", &self.index.len())
            .finish()
    }
}

impl Pack {
    pub fn open(pack_path: &Path, index_path: &Path) -> Result<Self> {
        let index = PackIndex::open(index_path)?;
        let data = map_file(pack_path)?;

        if data.len() < PACK_HEADER_SIZE || &data[..4] != PACK_SIGNATURE {
            return Err(Error::corrupt(pack_path.display(), "missing PACK signature"));
        }
        let version = BigEndian::read_u32(&data[4..8]);
        if version != 2 && version != 3 {
            return Err(Error::corrupt(
                pack_path.display(),
                format!("unsupported pack version {version}"),
            ));
        }
        let count = BigEndian::read_u32(&data[8..12]) as usize;
        if count != index.len() {
            return Err(Error::corrupt(
                pack_path.display(),
                format!("pack holds {count} objects, index lists {}", index.len()),
            ));
        }

        Ok(Pack {
            path: pack_path.to_path_buf(),
            index,
            data: Arc::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn index(&self) -> &PackIndex {
        &self.index
    }

    fn corrupt_at(&self, offset: u64, reason: impl Into<String>) -> Error {
        Error::corrupt(
            format!("{}@{}", self.path.display(), offset),
            reason.into(),
        )
    }

    fn byte_at(&self, position: usize, entry: u64) -> Result<u8> {
        self.data
            .get(position)
            .copied()
            .ok_or_else(|| self.corrupt_at(entry, "entry runs past the end of the pack"))
    }

    /// Decode the entry header at `offset`
    pub fn entry_header(&self, offset: u64) -> Result<PackEntryHeader> {
        let mut position = usize::try_from(offset)
            .map_err(|_| self.corrupt_at(offset, "offset out of range"))?;
        if position < PACK_HEADER_SIZE {
            return Err(self.corrupt_at(offset, "offset inside the pack header"));
        }

        let mut byte = self.byte_at(position, offset)?;
        position += 1;
        let type_code = (byte >> 4) & 0x07;
        let mut size = (byte & 0x0f) as u64;
        let mut shift = 4;
        while byte & 0x80 != 0 {
            byte = self.byte_at(position, offset)?;
            position += 1;
            if shift > 57 {
                return Err(self.corrupt_at(offset, "entry size overflows"));
            }
            size |= ((byte & 0x7f) as u64) << shift;
            shift += 7;
        }

        let kind = match type_code {
            OBJ_OFS_DELTA => {
                byte = self.byte_at(position, offset)?;
                position += 1;
                let mut distance = (byte & 0x7f) as u64;
                while byte & 0x80 != 0 {
                    byte = self.byte_at(position, offset)?;
                    position += 1;
                    distance = ((distance + 1) << 7) | (byte & 0x7f) as u64;
                }
                let base = offset
                    .checked_sub(distance)
                    .filter(|_| distance != 0)
                    .ok_or_else(|| self.corrupt_at(offset, "delta base offset out of range"))?;
                PackEntryKind::OfsDelta(base)
            }
            OBJ_REF_DELTA => {
                let end = position + OBJECT_ID_RAW_LENGTH;
                let base = self
                    .data
                    .get(position..end)
                    .and_then(ObjectId::try_from_slice)
                    .ok_or_else(|| self.corrupt_at(offset, "truncated delta base id"))?;
                position = end;
                PackEntryKind::RefDelta(base)
            }
            code => PackEntryKind::Base(
                ObjectType::from_pack_code(code)
                    .ok_or_else(|| self.corrupt_at(offset, format!("invalid type code {code}")))?,
            ),
        };

        Ok(PackEntryHeader {
            kind,
            size,
            data_offset: position,
        })
    }

    /// Inflate the entry's data (the delta payload for deltified entries)
    pub fn inflate(&self, header: &PackEntryHeader) -> Result<Vec<u8>> {
        let compressed = self
            .data
            .get(header.data_offset..)
            .ok_or_else(|| self.corrupt_at(header.data_offset as u64, "entry data missing"))?;

        let mut decoder = ZlibDecoder::new(compressed);
        let mut inflated = buffer_for(header.size);
        decoder
            .by_ref()
            .take(header.size)
            .read_to_end(&mut inflated)
            .map_err(|e| self.corrupt_at(header.data_offset as u64, e.to_string()))?;

        if inflated.len() as u64 != header.size {
            return Err(self.corrupt_at(
                header.data_offset as u64,
                format!("inflated {} bytes, header says {}", inflated.len(), header.size),
            ));
        }

        Ok(inflated)
    }

    /// Streaming reader over a non-delta entry's inflated data
    pub fn stream(&self, header: &PackEntryHeader) -> impl Read + Send + use<> {
        let source = MmapSlice {
            data: Arc::clone(&self.data),
            position: header.data_offset,
        };
        ZlibDecoder::new(source).take(header.size)
    }

    /// Result size of a delta without inflating more than its preamble
    pub fn delta_result_size(&self, header: &PackEntryHeader) -> Result<u64> {
        let compressed = self
            .data
            .get(header.data_offset..)
            .ok_or_else(|| self.corrupt_at(header.data_offset as u64, "entry data missing"))?;

        // two varints of at most 10 bytes each
        let mut preamble = Vec::with_capacity(20);
        ZlibDecoder::new(compressed)
            .take(20)
            .read_to_end(&mut preamble)
            .map_err(|e| self.corrupt_at(header.data_offset as u64, e.to_string()))?;

        let mut cursor = preamble.as_slice();
        read_delta_size(&mut cursor)?;
        read_delta_size(&mut cursor)
    }
}

/// `Read` over a shared memory map starting at an offset
struct MmapSlice {
    data: Arc<Mmap>,
    position: usize,
}

impl Read for MmapSlice {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.data.get(self.position..).unwrap_or_default();
        let read = remaining.len().min(buf.len());
        buf[..read].copy_from_slice(&remaining[..read]);
        self.position += read;
        Ok(read)
    }
}

/// Little-endian base-128 size used in delta preambles
fn read_delta_size(cursor: &mut &[u8]) -> Result<u64> {
    let mut size = 0u64;
    let mut shift = 0;
    loop {
        let (&byte, rest) = cursor
            .split_first()
            .ok_or_else(|| Error::corrupt("delta", "truncated size"))?;
        *cursor = rest;
        if shift > 63 {
            return Err(Error::corrupt("delta", "size overflows"));
        }
        size |= ((byte & 0x7f) as u64) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            return Ok(size);
        }
    }
}

fn next(cursor: &mut &[u8]) -> Result<u8> {
    let (&byte, rest) = cursor
        .split_first()
        .ok_or_else(|| Error::corrupt("delta", "truncated instruction"))?;
    *cursor = rest;
    Ok(byte)
}

/// Rebuild an object from its base and a git delta
pub fn apply_delta(base: &[u8], delta: &[u8]) -> Result<Vec<u8>> {
    let mut cursor = delta;
    let source_size = read_delta_size(&mut cursor)?;
    let target_size = read_delta_size(&mut cursor)?;

    if source_size != base.len() as u64 {
        return Err(Error::corrupt(
            "delta",
            format!("base is {} bytes, delta expects {source_size}", base.len()),
        ));
    }

    let mut target = buffer_for(target_size);

    while !cursor.is_empty() {
        let op = next(&mut cursor)?;

        if op & 0x80 != 0 {
            // copy from base: bits 0-3 select offset bytes, bits 4-6 size bytes
            let mut offset = 0usize;
            for i in 0..4 {
                if op & (1 << i) != 0 {
                    offset |= (next(&mut cursor)? as usize) << (8 * i);
                }
            }
            let mut size = 0usize;
            for i in 0..3 {
                if op & (0x10 << i) != 0 {
                    size |= (next(&mut cursor)? as usize) << (8 * i);
                }
            }
            if size == 0 {
                size = 0x10000;
            }

            let chunk = offset
                .checked_add(size)
                .and_then(|end| base.get(offset..end))
                .ok_or_else(|| Error::corrupt("delta", "copy outside of base"))?;
            target.extend_from_slice(chunk);
        } else if op != 0 {
            let size = op as usize;
            if cursor.len() < size {
                return Err(Error::corrupt("delta", "truncated insert"));
            }
            target.extend_from_slice(&cursor[..size]);
            cursor = &cursor[size..];
        } else {
            return Err(Error::corrupt("delta", "reserved opcode 0"));
        }

        if target.len() as u64 > target_size {
            return Err(Error::corrupt(
                "delta",
                format!("output grows past the declared {target_size} bytes"),
            ));
        }
    }

    if target.len() as u64 != target_size {
        return Err(Error::corrupt(
            "delta",
            format!("produced {} bytes, expected {target_size}", target.len()),
        ));
    }

    Ok(target)
}
