//! Tree snapshots as zip or tar archives
//!
//! Archives are reproducible: entries follow canonical tree order and every
//! entry carries the committer time of the archived commit.

use crate::areas::database::Database;
use crate::artifacts::log::rev_list::CommitNode;
use crate::artifacts::objects::entry_mode::EntryMode;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::tree::resolver::{TreeItem, TreeWalker};
use crate::errors::{Error, IoResultExt, Result};
use chrono::{DateTime, Datelike, FixedOffset, Timelike};
use std::io::{self, Read, Seek, Write};
use std::str::FromStr;
use zip::write::SimpleFileOptions;

/// Stand-in path for io errors raised while writing an archive
const ARCHIVE_PATH: &str = "<archive>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Tar,
}

impl ArchiveFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::Tar => "tar",
        }
    }
}

impl FromStr for ArchiveFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "zip" => Ok(ArchiveFormat::Zip),
            "tar" => Ok(ArchiveFormat::Tar),
            _ => Err(Error::UnknownArchiveFormat(s.to_string())),
        }
    }
}

/// One entry to be written, in archive order
enum ArchiveEntry {
    Directory { path: String },
    File { path: String, mode: EntryMode, oid: ObjectId },
    Symlink { path: String, target: String },
}

/// Write the full tree of `commit` into `writer`
///
/// `prefix`, when given, is prepended to every path (`project-1.0/`).
pub fn write_archive<W: Write + Seek>(
    database: &Database,
    commit: ObjectId,
    format: ArchiveFormat,
    prefix: Option<&str>,
    writer: W,
) -> Result<W> {
    let node = CommitNode::load(database, commit)?;
    let mtime = node.commit.timestamp();
    let prefix = prefix
        .map(|prefix| prefix.trim_matches('/'))
        .filter(|prefix| !prefix.is_empty());

    let mut entries = Vec::new();
    if let Some(prefix) = prefix {
        entries.push(ArchiveEntry::Directory {
            path: prefix.to_string(),
        });
    }
    for item in TreeWalker::new(database, *node.commit.tree_oid())
        .map_err(|e| e.referenced_by(&commit))?
    {
        let TreeItem { path, entry } = item?;
        let path = match prefix {
            Some(prefix) => format!("{prefix}/{path}"),
            None => path,
        };

        entries.push(match entry.mode {
            EntryMode::Directory | EntryMode::Submodule => ArchiveEntry::Directory { path },
            EntryMode::Symlink => {
                let blob = database
                    .parse_object_as_blob(&entry.oid)
                    .map_err(|e| e.referenced_by(&commit))?;
                ArchiveEntry::Symlink {
                    path,
                    target: String::from_utf8_lossy(blob.content()).into_owned(),
                }
            }
            EntryMode::File(_) => ArchiveEntry::File {
                path,
                mode: entry.mode,
                oid: entry.oid,
            },
        });
    }

    tracing::debug!(%commit, ?format, entries = entries.len(), "writing archive");
    match format {
        ArchiveFormat::Tar => write_tar(database, &entries, mtime, writer),
        ArchiveFormat::Zip => write_zip(database, &entries, mtime, writer),
    }
}

fn open_content(database: &Database, oid: &ObjectId) -> Result<(u64, Box<dyn Read + Send>)> {
    let reader = database.open_reader(oid)?;
    Ok((reader.size, reader.reader))
}

fn write_tar<W: Write>(
    database: &Database,
    entries: &[ArchiveEntry],
    mtime: DateTime<FixedOffset>,
    writer: W,
) -> Result<W> {
    let mut builder = tar::Builder::new(writer);
    let mtime = u64::try_from(mtime.timestamp()).unwrap_or(0);

    let header_for = |entry_type: tar::EntryType, mode: u32, size: u64| {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(entry_type);
        header.set_mode(mode);
        header.set_size(size);
        header.set_mtime(mtime);
        header.set_uid(0);
        header.set_gid(0);
        header
    };

    for entry in entries {
        match entry {
            ArchiveEntry::Directory { path } => {
                let mut header = header_for(tar::EntryType::Directory, 0o755, 0);
                builder
                    .append_data(&mut header, format!("{path}/"), io::empty())
                    .with_path(ARCHIVE_PATH)?;
            }
            ArchiveEntry::File { path, mode, oid } => {
                let (size, content) = open_content(database, oid)?;
                let mut header = header_for(tar::EntryType::Regular, mode.unix_permissions(), size);
                builder
                    .append_data(&mut header, path, content)
                    .with_path(ARCHIVE_PATH)?;
            }
            ArchiveEntry::Symlink { path, target } => {
                let mut header = header_for(tar::EntryType::Symlink, 0o777, 0);
                builder
                    .append_link(&mut header, path, target)
                    .with_path(ARCHIVE_PATH)?;
            }
        }
    }

    builder.into_inner().with_path(ARCHIVE_PATH)
}

fn zip_time(mtime: DateTime<FixedOffset>) -> zip::DateTime {
    let utc = mtime.naive_utc();
    let (Ok(year), Ok(month), Ok(day), Ok(hour), Ok(minute), Ok(second)) = (
        u16::try_from(utc.year()),
        u8::try_from(utc.month()),
        u8::try_from(utc.day()),
        u8::try_from(utc.hour()),
        u8::try_from(utc.minute()),
        u8::try_from(utc.second()),
    ) else {
        return zip::DateTime::default();
    };

    // dates before 1980 cannot be represented
    zip::DateTime::from_date_and_time(year, month, day, hour, minute, second).unwrap_or_default()
}

fn write_zip<W: Write + Seek>(
    database: &Database,
    entries: &[ArchiveEntry],
    mtime: DateTime<FixedOffset>,
    writer: W,
) -> Result<W> {
    let mut zip = zip::ZipWriter::new(writer);
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .last_modified_time(zip_time(mtime));

    for entry in entries {
        match entry {
            ArchiveEntry::Directory { path } => {
                zip.add_directory(path.as_str(), options.unix_permissions(0o755))?;
            }
            ArchiveEntry::File { path, mode, oid } => {
                let (size, mut content) = open_content(database, oid)?;
                let file_options = options
                    .unix_permissions(mode.unix_permissions())
                    .large_file(size >= u64::from(u32::MAX));
                zip.start_file(path.as_str(), file_options)?;
                io::copy(&mut content, &mut zip).with_path(ARCHIVE_PATH)?;
            }
            ArchiveEntry::Symlink { path, target } => {
                zip.add_symlink(path.as_str(), target.as_str(), options)?;
            }
        }
    }

    Ok(zip.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("zip", ArchiveFormat::Zip)]
    #[case("TAR", ArchiveFormat::Tar)]
    fn parses_formats(#[case] raw: &str, #[case] expected: ArchiveFormat) {
        assert_eq!(raw.parse::<ArchiveFormat>().unwrap(), expected);
        assert_eq!(expected.extension(), raw.to_ascii_lowercase());
    }

    #[test]
    fn rejects_unknown_formats() {
        assert!(matches!(
            "rar".parse::<ArchiveFormat>(),
            Err(Error::UnknownArchiveFormat(_))
        ));
    }

    #[test]
    fn zip_times_before_1980_fall_back_to_the_epoch_of_the_format() {
        let early = DateTime::from_timestamp(0, 0).unwrap().fixed_offset();
        assert_eq!(zip_time(early), zip::DateTime::default());

        let later = DateTime::from_timestamp(1_700_000_000, 0).unwrap().fixed_offset();
        assert_eq!(zip_time(later).year(), 2023);
    }
}
