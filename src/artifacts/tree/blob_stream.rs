use crate::areas::database::ObjectReader;
use crate::areas::pack::buffer_for;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::Error;
use bytes::{Bytes, BytesMut};
use std::io::{self, Read};

/// Forward-only reader over the content of one blob
///
/// The total size is known up front from the object header; the content is
/// inflated lazily as the caller reads. Running dry before that size is an
/// `InvalidData` error wrapping `Error::CorruptObject`.
pub struct BlobStream {
    oid: ObjectId,
    reader: Box<dyn Read + Send>,
    size: u64,
    remaining: u64,
}

impl BlobStream {
    pub fn new(object_reader: ObjectReader) -> Self {
        BlobStream {
            oid: object_reader.oid,
            reader: object_reader.reader,
            size: object_reader.size,
            remaining: object_reader.size,
        }
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Read the remaining content in chunks of at most `chunk_size` bytes
    pub fn chunks(self, chunk_size: usize) -> Chunks {
        Chunks {
            stream: self,
            chunk_size: chunk_size.max(1),
            done: false,
        }
    }

    /// Read everything that is left
    pub fn read_to_bytes(mut self) -> io::Result<Bytes> {
        let mut content = buffer_for(self.size);
        self.read_to_end(&mut content)?;
        Ok(Bytes::from(content))
    }
}

impl Read for BlobStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let read = self.reader.read(buf)?;
        if read == 0 && self.remaining > 0 {
            let missing = self.remaining;
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                Error::corrupt(
                    self.oid,
                    format!("content ends {missing} bytes short of its declared size"),
                ),
            ));
        }
        self.remaining = self.remaining.saturating_sub(read as u64);

        Ok(read)
    }
}

impl std::fmt::Debug for BlobStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobStream").field("size", &self.size).finish()
    }
}

pub struct Chunks {
    stream: BlobStream,
    chunk_size: usize,
    done: bool,
}

impl Iterator for Chunks {
    type Item = io::Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut chunk = BytesMut::zeroed(self.chunk_size);
        let mut filled = 0;
        while filled < self.chunk_size {
            match self.stream.read(&mut chunk[filled..]) {
                Ok(0) => {
                    self.done = true;
                    break;
                }
                Ok(read) => filled += read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }

        if filled == 0 {
            return None;
        }
        chunk.truncate(filled);
        Some(Ok(chunk.freeze()))
    }
}
