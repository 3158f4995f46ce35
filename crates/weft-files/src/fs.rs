//! Read-only file system contract.

use std::io::{self, Read, Seek};
use std::time::SystemTime;

/// Reader that can also seek.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek> ReadSeek for T {}

/// Content of an opened file.
pub enum Reader {
    /// Natively seekable handle.
    Seekable(Box<dyn ReadSeek + Send>),
    /// Handle that can only be read front to back.
    Stream(Box<dyn Read + Send>),
}

impl std::fmt::Debug for Reader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Seekable(_) => f.write_str("Reader::Seekable"),
            Self::Stream(_) => f.write_str("Reader::Stream"),
        }
    }
}

/// File metadata as reported by a [`FileSystem`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileInfo {
    /// Base name of the file.
    pub name: String,
    /// Size in bytes (zero for directories).
    pub len: u64,
    /// Last modification time.
    pub modified: SystemTime,
    /// Whether the entry is a directory.
    pub is_dir: bool,
}

/// An opened file or directory.
pub trait File: Send {
    /// Metadata of the opened entry.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the metadata cannot be read.
    fn stat(&self) -> io::Result<FileInfo>;

    /// Consume the handle and return its content.
    fn into_reader(self: Box<Self>) -> Reader;
}

/// Read-only file system addressed by `/`-separated names.
///
/// Names may start with `/`; both `"a/b.txt"` and `"/a/b.txt"` refer to the
/// same file.
pub trait FileSystem: Send + Sync {
    /// Open a file or directory.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::NotFound`] if nothing exists at `name`, or
    /// another I/O error if it cannot be opened.
    fn open(&self, name: &str) -> io::Result<Box<dyn File>>;

    /// List the entries of a directory, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if `name` is not a readable directory.
    fn read_dir(&self, name: &str) -> io::Result<Vec<FileInfo>>;
}
