//! File system backed by an OS directory tree.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::fs::{File, FileInfo, FileSystem, Reader};

/// Name rejected because it could escape the root directory.
#[derive(Debug, thiserror::Error)]
#[error("Invalid file name: {0}")]
pub struct InvalidPath(pub String);

/// [`FileSystem`] rooted at a directory on disk.
#[derive(Clone, Debug)]
pub struct DirFs {
    root: PathBuf,
}

impl DirFs {
    /// Create a file system serving files under `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a file name to a path under the root.
    ///
    /// Rejects names with parent directory components (`..`) or that are
    /// absolute after stripping leading slashes.
    fn resolve(&self, name: &str) -> io::Result<PathBuf> {
        let relative = Path::new(name.trim_start_matches('/'));
        let escapes = relative.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes || name.contains('\0') {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                InvalidPath(name.to_owned()),
            ));
        }
        Ok(self.root.join(relative))
    }
}

impl FileSystem for DirFs {
    fn open(&self, name: &str) -> io::Result<Box<dyn File>> {
        let path = self.resolve(name)?;
        let file = fs::File::open(&path)?;
        Ok(Box::new(OsFile {
            name: base_name(&path),
            file,
        }))
    }

    fn read_dir(&self, name: &str) -> io::Result<Vec<FileInfo>> {
        let path = self.resolve(name)?;
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            entries.push(file_info(
                entry.file_name().to_string_lossy().into_owned(),
                &entry.metadata()?,
            ));
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

/// Opened OS file.
struct OsFile {
    name: String,
    file: fs::File,
}

impl File for OsFile {
    fn stat(&self) -> io::Result<FileInfo> {
        Ok(file_info(self.name.clone(), &self.file.metadata()?))
    }

    fn into_reader(self: Box<Self>) -> Reader {
        Reader::Seekable(Box::new(self.file))
    }
}

pub(crate) fn file_info(name: String, metadata: &fs::Metadata) -> FileInfo {
    FileInfo {
        name,
        len: if metadata.is_dir() { 0 } else { metadata.len() },
        modified: metadata.modified().unwrap_or(UNIX_EPOCH),
        is_dir: metadata.is_dir(),
    }
}

pub(crate) fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
