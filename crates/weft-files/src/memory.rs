//! In-memory file system.

use std::collections::BTreeMap;
use std::io::{self, Cursor};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::fs::{File, FileInfo, FileSystem, Reader};

#[derive(Clone, Debug)]
struct MemoryEntry {
    data: Arc<[u8]>,
    modified: SystemTime,
}

/// [`FileSystem`] holding file contents in memory.
///
/// Directories are implied by the file names. Opened files are
/// stream-only: their readers cannot seek.
///
/// ```
/// use std::time::UNIX_EPOCH;
/// use weft_files::{FileSystem, MemoryFs};
///
/// let fs = MemoryFs::new().with_file("docs/guide.txt", "hello", UNIX_EPOCH);
/// assert!(fs.open("/docs/guide.txt").is_ok());
/// assert!(fs.open("docs").unwrap().stat().unwrap().is_dir);
/// ```
#[derive(Clone, Debug, Default)]
pub struct MemoryFs {
    files: BTreeMap<String, MemoryEntry>,
}

impl MemoryFs {
    /// Create an empty file system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file.
    pub fn insert(&mut self, name: &str, data: impl Into<Vec<u8>>, modified: SystemTime) {
        let data: Vec<u8> = data.into();
        self.files.insert(
            normalize(name).to_owned(),
            MemoryEntry {
                data: Arc::from(data),
                modified,
            },
        );
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with_file(mut self, name: &str, data: impl Into<Vec<u8>>, modified: SystemTime) -> Self {
        self.insert(name, data, modified);
        self
    }

    fn is_dir(&self, name: &str) -> bool {
        name.is_empty() || self.children(name).next().is_some()
    }

    /// Files below directory `name`, as paths relative to it.
    fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = (&'a str, &'a MemoryEntry)> {
        self.files.iter().filter_map(move |(path, entry)| {
            let rest = if name.is_empty() {
                path.as_str()
            } else {
                path.strip_prefix(name)?.strip_prefix('/')?
            };
            Some((rest, entry))
        })
    }
}

impl FileSystem for MemoryFs {
    fn open(&self, name: &str) -> io::Result<Box<dyn File>> {
        let name = normalize(name);
        let base = name.rsplit('/').next().unwrap_or(name).to_owned();

        if let Some(entry) = self.files.get(name) {
            return Ok(Box::new(MemoryFile {
                info: FileInfo {
                    name: base,
                    len: entry.data.len() as u64,
                    modified: entry.modified,
                    is_dir: false,
                },
                data: Some(Arc::clone(&entry.data)),
            }));
        }
        if self.is_dir(name) {
            return Ok(Box::new(MemoryFile {
                info: FileInfo {
                    name: base,
                    len: 0,
                    modified: UNIX_EPOCH,
                    is_dir: true,
                },
                data: None,
            }));
        }
        Err(io::Error::from(io::ErrorKind::NotFound))
    }

    fn read_dir(&self, name: &str) -> io::Result<Vec<FileInfo>> {
        let name = normalize(name);
        if !self.is_dir(name) {
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }

        let mut entries: BTreeMap<&str, FileInfo> = BTreeMap::new();
        for (rest, entry) in self.children(name) {
            match rest.split_once('/') {
                Some((dir, _)) => {
                    entries.entry(dir).or_insert_with(|| FileInfo {
                        name: dir.to_owned(),
                        len: 0,
                        modified: UNIX_EPOCH,
                        is_dir: true,
                    });
                }
                None => {
                    entries.insert(
                        rest,
                        FileInfo {
                            name: rest.to_owned(),
                            len: entry.data.len() as u64,
                            modified: entry.modified,
                            is_dir: false,
                        },
                    );
                }
            }
        }
        Ok(entries.into_values().collect())
    }
}

struct MemoryFile {
    info: FileInfo,
    data: Option<Arc<[u8]>>,
}

impl File for MemoryFile {
    fn stat(&self) -> io::Result<FileInfo> {
        Ok(self.info.clone())
    }

    fn into_reader(self: Box<Self>) -> Reader {
        let data = self.data.unwrap_or_else(|| Arc::from(Vec::new()));
        Reader::Stream(Box::new(Cursor::new(data)))
    }
}

fn normalize(name: &str) -> &str {
    name.trim_matches('/')
}

#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;

    fn create_fs() -> MemoryFs {
        let modified = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        MemoryFs::new()
            .with_file("index.html", "<h1>home</h1>", modified)
            .with_file("docs/guide.txt", "guide", modified)
            .with_file("docs/api/ref.txt", "ref", modified)
    }

    #[test]
    fn test_open_file_is_stream_only() {
        let fs = create_fs();

        let file = fs.open("/docs/guide.txt").unwrap();
        let info = file.stat().unwrap();

        assert_eq!(info.name, "guide.txt");
        assert_eq!(info.len, 5);
        assert!(!info.is_dir);

        let Reader::Stream(mut reader) = file.into_reader() else {
            panic!("expected stream reader");
        };
        let mut content = String::new();
        reader.read_to_string(&mut content).unwrap();
        assert_eq!(content, "guide");
    }

    #[test]
    fn test_open_implied_directory() {
        let fs = create_fs();

        assert!(fs.open("docs").unwrap().stat().unwrap().is_dir);
        assert!(fs.open("docs/api/").unwrap().stat().unwrap().is_dir);
        assert!(fs.open("/").unwrap().stat().unwrap().is_dir);
    }

    #[test]
    fn test_open_missing() {
        let fs = create_fs();

        let err = fs.open("doc").err().unwrap();

        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_read_dir() {
        let fs = create_fs();

        let root: Vec<_> = fs
            .read_dir("/")
            .unwrap()
            .into_iter()
            .map(|e| (e.name, e.is_dir))
            .collect();
        let docs: Vec<_> = fs
            .read_dir("docs")
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();

        assert_eq!(
            root,
            vec![("docs".to_owned(), true), ("index.html".to_owned(), false)]
        );
        assert_eq!(docs, vec!["api".to_owned(), "guide.txt".to_owned()]);
    }

    #[test]
    fn test_read_dir_of_file_fails() {
        let fs = create_fs();

        assert!(fs.read_dir("index.html").is_err());
    }

    #[test]
    fn test_insert_replaces() {
        let mut fs = create_fs();

        fs.insert("index.html", "new", UNIX_EPOCH);

        assert_eq!(fs.open("index.html").unwrap().stat().unwrap().len, 3);
    }
}
