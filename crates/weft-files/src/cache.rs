//! Content-hash `ETag` cache.

use std::collections::HashMap;
use std::io::{self, Read};
use std::sync::{Mutex, PoisonError};
use std::time::SystemTime;

use sha2::{Digest, Sha256};

/// Cached `ETag` for one file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheEntry {
    /// Modification time the tag was computed for.
    pub modified: SystemTime,
    /// Quoted lowercase hex SHA-256 of the content.
    pub tag: String,
}

/// File name to [`CacheEntry`] map shared by concurrent requests.
///
/// Entries are never evicted; a stale entry is replaced when the file's
/// modification time no longer matches.
#[derive(Debug, Default)]
pub struct HashCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl HashCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry stored for `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<CacheEntry> {
        self.lock().get(name).cloned()
    }

    /// Store `entry` for `name`, replacing any previous one.
    pub fn put(&self, name: &str, entry: CacheEntry) {
        self.lock().insert(name.to_owned(), entry);
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Hash everything `reader` yields into a quoted `ETag` value.
///
/// # Errors
///
/// Returns an I/O error if reading fails.
pub fn compute_etag<R: Read + ?Sized>(reader: &mut R) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = [0_u8; 8192];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(format!("\"{}\"", hex::encode(hasher.finalize())))
}
