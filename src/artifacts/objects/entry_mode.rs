use crate::errors::{Error, Result};

#[derive(Debug, Clone, Copy, Eq, Ord, Default, PartialEq, PartialOrd, Hash)]
pub enum FileMode {
    #[default]
    Regular,
    Executable,
}

/// Mode of a tree entry as stored in a tree object
#[derive(Debug, Clone, Copy, Eq, Ord, PartialEq, PartialOrd, Hash)]
pub enum EntryMode {
    File(FileMode),
    Symlink,
    Submodule,
    Directory,
}

impl EntryMode {
    pub fn as_str(&self) -> &str {
        match self {
            EntryMode::File(FileMode::Regular) => "100644",
            EntryMode::File(FileMode::Executable) => "100755",
            EntryMode::Symlink => "120000",
            EntryMode::Submodule => "160000",
            EntryMode::Directory => "040000",
        }
    }

    pub fn as_u32(&self) -> u32 {
        match self {
            EntryMode::File(FileMode::Regular) => 0o100644,
            EntryMode::File(FileMode::Executable) => 0o100755,
            EntryMode::Symlink => 0o120000,
            EntryMode::Submodule => 0o160000,
            EntryMode::Directory => 0o40000,
        }
    }

    /// Parse the octal mode string of a tree entry
    ///
    /// Old git versions wrote group-writable files as `100664`; those are
    /// read as regular files.
    pub fn from_octal_str(mode: &str) -> Result<Self> {
        let raw = u32::from_str_radix(mode, 8)
            .map_err(|_| Error::corrupt("tree entry", format!("invalid mode '{mode}'")))?;

        match raw {
            0o100644 | 0o100664 | 0o100600 => Ok(EntryMode::File(FileMode::Regular)),
            0o100755 => Ok(EntryMode::File(FileMode::Executable)),
            0o120000 => Ok(EntryMode::Symlink),
            0o160000 => Ok(EntryMode::Submodule),
            0o40000 => Ok(EntryMode::Directory),
            _ => Err(Error::corrupt(
                "tree entry",
                format!("unsupported mode '{mode}'"),
            )),
        }
    }

    pub fn is_tree(&self) -> bool {
        matches!(self, EntryMode::Directory)
    }

    /// Whether the entry's object is a blob in this repository
    pub fn is_blob(&self) -> bool {
        matches!(self, EntryMode::File(_) | EntryMode::Symlink)
    }

    pub fn is_executable(&self) -> bool {
        matches!(self, EntryMode::File(FileMode::Executable))
    }

    /// Unix permission bits used when materializing the entry in an archive
    pub fn unix_permissions(&self) -> u32 {
        match self {
            EntryMode::File(FileMode::Executable) | EntryMode::Directory => 0o755,
            EntryMode::Symlink => 0o777,
            EntryMode::File(FileMode::Regular) | EntryMode::Submodule => 0o644,
        }
    }
}
