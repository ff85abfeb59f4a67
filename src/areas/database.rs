//! Object database
//!
//! Reads objects from `.git/objects`: loose objects first, then every pack
//! listed under `objects/pack`. Packs are discovered and mapped once per
//! handle, on first use.

use crate::areas::pack::{apply_delta, buffer_for, Pack, PackEntryKind};
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object::{ObjectBox, RawObject};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tag::Tag;
use crate::artifacts::objects::tree::Tree;
use crate::errors::{Error, IoResultExt, Result};
use flate2::read::ZlibDecoder;
use once_cell::sync::OnceCell;
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

type LooseReader = io::Take<BufReader<ZlibDecoder<File>>>;

/// Forward-only reader over an object's payload plus its header
pub struct ObjectReader {
    pub oid: ObjectId,
    pub object_type: ObjectType,
    pub size: u64,
    pub reader: Box<dyn Read + Send>,
}

#[derive(Debug)]
pub struct Database {
    path: PathBuf,
    packs: OnceCell<Vec<Pack>>,
    max_delta_depth: usize,
}

impl Database {
    pub fn new(path: PathBuf, max_delta_depth: usize) -> Self {
        Database {
            path,
            packs: OnceCell::new(),
            max_delta_depth,
        }
    }

    pub fn objects_path(&self) -> &Path {
        &self.path
    }

    fn packs(&self) -> Result<&[Pack]> {
        self.packs
            .get_or_try_init(|| Self::discover_packs(&self.path.join("pack")))
            .map(Vec::as_slice)
    }

    fn discover_packs(pack_dir: &Path) -> Result<Vec<Pack>> {
        let entries = match std::fs::read_dir(pack_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).with_path(pack_dir),
        };

        let mut pack_paths = Vec::new();
        for entry in entries {
            let path = entry.with_path(pack_dir)?.path();
            if path.extension().is_some_and(|ext| ext == "pack") {
                pack_paths.push(path);
            }
        }
        // stable order, so REF_DELTA bases resolve the same way every run
        pack_paths.sort();

        let mut packs = Vec::with_capacity(pack_paths.len());
        for pack_path in pack_paths {
            let index_path = pack_path.with_extension("idx");
            if !index_path.is_file() {
                tracing::warn!(pack = %pack_path.display(), "skipping pack without index");
                continue;
            }

            let pack = Pack::open(&pack_path, &index_path)?;
            tracing::debug!(
                pack = %pack_path.display(),
                objects = pack.index().len(),
                "indexed pack"
            );
            packs.push(pack);
        }

        Ok(packs)
    }

    /// Which pack holds `oid`, and at which offset
    fn locate_packed(&self, oid: &ObjectId) -> Result<Option<(usize, u64)>> {
        for (position, pack) in self.packs()?.iter().enumerate() {
            if let Some(offset) = pack.index().lookup(oid)? {
                return Ok(Some((position, offset)));
            }
        }
        Ok(None)
    }

    fn loose_path(&self, oid: &ObjectId) -> PathBuf {
        self.path.join(oid.to_path())
    }

    fn open_loose(&self, oid: &ObjectId) -> Result<Option<(ObjectType, u64, LooseReader)>> {
        let path = self.loose_path(oid);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_path(path),
        };

        let mut reader = BufReader::new(ZlibDecoder::new(file));
        let (object_type, size) = ObjectType::parse_object_header(&mut reader)
            .map_err(|e| Error::corrupt(oid, e.to_string()))?;

        Ok(Some((object_type, size, reader.take(size))))
    }

    fn read_loose(&self, oid: &ObjectId) -> Result<Option<RawObject>> {
        let Some((object_type, size, mut reader)) = self.open_loose(oid)? else {
            return Ok(None);
        };

        let mut data = buffer_for(size);
        reader
            .read_to_end(&mut data)
            .map_err(|e| Error::corrupt(oid, format!("decompression failed: {e}")))?;
        if data.len() as u64 != size {
            return Err(Error::corrupt(
                oid,
                format!("header declares {size} bytes, found {}", data.len()),
            ));
        }

        Ok(Some(RawObject {
            object_type,
            data: data.into(),
        }))
    }

    /// Materialize a packed object, resolving its delta chain
    fn read_packed(&self, oid: &ObjectId, start: (usize, u64)) -> Result<RawObject> {
        let packs = self.packs()?;
        let (mut pack_position, mut offset) = start;
        let mut visited = HashSet::new();
        let mut deltas = Vec::new();

        let base = loop {
            if !visited.insert((pack_position, offset)) {
                return Err(Error::corrupt(oid, "delta chain loops back on itself"));
            }
            if deltas.len() > self.max_delta_depth {
                return Err(Error::corrupt(
                    oid,
                    format!("delta chain deeper than {}", self.max_delta_depth),
                ));
            }

            let pack = &packs[pack_position];
            let header = pack.entry_header(offset)?;
            match header.kind {
                PackEntryKind::Base(object_type) => {
                    break RawObject {
                        object_type,
                        data: pack.inflate(&header)?.into(),
                    };
                }
                PackEntryKind::OfsDelta(base_offset) => {
                    deltas.push(pack.inflate(&header)?);
                    offset = base_offset;
                }
                PackEntryKind::RefDelta(base_oid) => {
                    deltas.push(pack.inflate(&header)?);
                    match self.locate_packed(&base_oid)? {
                        Some(location) => (pack_position, offset) = location,
                        None => {
                            break self.read_loose(&base_oid)?.ok_or_else(|| {
                                Error::corrupt(oid, format!("delta base {base_oid} is missing"))
                            })?;
                        }
                    }
                }
            }
        };

        tracing::trace!(%oid, depth = deltas.len(), "resolved delta chain");

        let mut data = base.data.to_vec();
        for delta in deltas.iter().rev() {
            data = apply_delta(&data, delta).map_err(|e| match e {
                Error::CorruptObject { reason, .. } => Error::corrupt(oid, reason),
                other => other,
            })?;
        }

        Ok(RawObject {
            object_type: base.object_type,
            data: data.into(),
        })
    }

    /// Type and inflated payload of an object
    pub fn read_raw(&self, oid: &ObjectId) -> Result<RawObject> {
        if let Some(raw) = self.read_loose(oid)? {
            return Ok(raw);
        }

        match self.locate_packed(oid)? {
            Some(location) => self.read_packed(oid, location),
            None => Err(Error::ObjectNotFound(*oid)),
        }
    }

    pub fn parse_object(&self, oid: &ObjectId) -> Result<ObjectBox> {
        ObjectBox::parse(self.read_raw(oid)?).map_err(|e| match e {
            Error::CorruptObject { reason, .. } => Error::corrupt(oid, reason),
            other => other,
        })
    }

    pub fn parse_object_as_commit(&self, oid: &ObjectId) -> Result<Commit> {
        self.parse_object(oid)?.into_commit(oid)
    }

    pub fn parse_object_as_tree(&self, oid: &ObjectId) -> Result<Tree> {
        self.parse_object(oid)?.into_tree(oid)
    }

    pub fn parse_object_as_blob(&self, oid: &ObjectId) -> Result<Blob> {
        self.parse_object(oid)?.into_blob(oid)
    }

    pub fn parse_object_as_tag(&self, oid: &ObjectId) -> Result<Tag> {
        match self.parse_object(oid)? {
            ObjectBox::Tag(tag) => Ok(*tag),
            other => Err(Error::corrupt(
                oid,
                format!("expected tag, found {}", other.object_type()),
            )),
        }
    }

    pub fn contains(&self, oid: &ObjectId) -> Result<bool> {
        Ok(self.loose_path(oid).is_file() || self.locate_packed(oid)?.is_some())
    }

    /// Object type and size without reading the payload
    pub fn read_header(&self, oid: &ObjectId) -> Result<(ObjectType, u64)> {
        if let Some((object_type, size, _)) = self.open_loose(oid)? {
            return Ok((object_type, size));
        }

        let packs = self.packs()?;
        let Some((mut pack_position, mut offset)) = self.locate_packed(oid)? else {
            return Err(Error::ObjectNotFound(*oid));
        };

        let outer = packs[pack_position].entry_header(offset)?;
        let size = match outer.kind {
            PackEntryKind::Base(object_type) => return Ok((object_type, outer.size)),
            _ => packs[pack_position].delta_result_size(&outer)?,
        };

        // only the type is still unknown: follow base headers to the bottom
        let mut visited = HashSet::new();
        let mut header = outer;
        loop {
            if !visited.insert((pack_position, offset)) || visited.len() > self.max_delta_depth + 1
            {
                return Err(Error::corrupt(oid, "delta chain loops back on itself"));
            }

            match header.kind {
                PackEntryKind::Base(object_type) => return Ok((object_type, size)),
                PackEntryKind::OfsDelta(base_offset) => offset = base_offset,
                PackEntryKind::RefDelta(base_oid) => match self.locate_packed(&base_oid)? {
                    Some(location) => (pack_position, offset) = location,
                    None => {
                        let (object_type, _, _) = self.open_loose(&base_oid)?.ok_or_else(|| {
                            Error::corrupt(oid, format!("delta base {base_oid} is missing"))
                        })?;
                        return Ok((object_type, size));
                    }
                },
            }
            header = packs[pack_position].entry_header(offset)?;
        }
    }

    /// Open a forward-only reader over an object's payload
    ///
    /// Loose objects and non-delta packed objects are inflated as they are
    /// read; deltified objects have to be rebuilt in memory first.
    pub fn open_reader(&self, oid: &ObjectId) -> Result<ObjectReader> {
        if let Some((object_type, size, reader)) = self.open_loose(oid)? {
            return Ok(ObjectReader {
                oid: *oid,
                object_type,
                size,
                reader: Box::new(reader),
            });
        }

        let Some((pack_position, offset)) = self.locate_packed(oid)? else {
            return Err(Error::ObjectNotFound(*oid));
        };
        let pack = &self.packs()?[pack_position];
        let header = pack.entry_header(offset)?;

        if let PackEntryKind::Base(object_type) = header.kind {
            return Ok(ObjectReader {
                oid: *oid,
                object_type,
                size: header.size,
                reader: Box::new(pack.stream(&header)),
            });
        }

        let raw = self.read_packed(oid, (pack_position, offset))?;
        Ok(ObjectReader {
            oid: *oid,
            object_type: raw.object_type,
            size: raw.data.len() as u64,
            reader: Box::new(Cursor::new(raw.data)),
        })
    }

    /// Find all objects whose id starts with the given hexadecimal prefix.
    ///
    /// Searches the loose fan-out directories and every pack index. Duplicates
    /// (an object both loose and packed) are reported once.
    pub fn find_objects_by_prefix(&self, prefix: &str) -> Result<Vec<ObjectId>> {
        let prefix = prefix.to_ascii_lowercase();
        let mut matches = Vec::new();

        let directories: Vec<String> = match prefix.get(..2) {
            Some(dir_name) => vec![dir_name.to_string()],
            None => (0..=255u8).map(|i| format!("{i:02x}")).collect(),
        };

        for dir_name in directories {
            let dir_path = self.path.join(&dir_name);
            let entries = match std::fs::read_dir(&dir_path) {
                Ok(entries) => entries,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e).with_path(dir_path),
            };

            for entry in entries {
                let entry = entry.with_path(&dir_path)?;
                let full_oid = format!("{}{}", dir_name, entry.file_name().to_string_lossy());
                if full_oid.starts_with(&prefix)
                    && let Ok(oid) = ObjectId::try_parse(&full_oid)
                {
                    matches.push(oid);
                }
            }
        }

        for pack in self.packs()? {
            matches.extend(pack.index().find_by_prefix(&prefix));
        }

        matches.sort();
        matches.dedup();
        Ok(matches)
    }
}
