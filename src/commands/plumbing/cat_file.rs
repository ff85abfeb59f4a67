use crate::areas::repository::Repository;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::tree::blob_stream::BlobStream;
use clap::ValueEnum;
use std::io::Write;

/// What `cat-file` prints about an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CatFileMode {
    /// Object type
    Type,
    /// Payload size in bytes
    Size,
    /// Content, pretty-printed by type
    Pretty,
}

impl Repository {
    pub fn cat_file(&self, object: &str, mode: CatFileMode) -> anyhow::Result<()> {
        let oid = self.resolve_object(object)?;

        match mode {
            CatFileMode::Type => {
                let (object_type, _) = self.database().read_header(&oid)?;
                writeln!(self.writer(), "{object_type}")?;
            }
            CatFileMode::Size => {
                let (_, size) = self.database().read_header(&oid)?;
                writeln!(self.writer(), "{size}")?;
            }
            CatFileMode::Pretty => {
                let reader = self.database().open_reader(&oid)?;
                if reader.object_type == ObjectType::Blob {
                    // blobs are printed byte for byte
                    let chunk_size = self.settings().stream_chunk_size;
                    for chunk in BlobStream::new(reader).chunks(chunk_size) {
                        self.writer().write_all(&chunk?)?;
                    }
                } else {
                    let object = self.database().parse_object(&oid)?;
                    writeln!(self.writer(), "{}", object.display())?;
                }
            }
        }

        Ok(())
    }
}
