//! Conditional file responses with cached `ETag`s.

use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::time::SystemTime;

use axum::http::header::{self, HeaderMap, HeaderValue};
use axum::response::Response;
use weft_http::{HttpError, RequestMeta, serve_content};

use crate::cache::{CacheEntry, HashCache, compute_etag};
use crate::fs::{FileSystem, ReadSeek, Reader};

/// Serves files from a [`FileSystem`] with content-hash `ETag`s.
///
/// `ETag`s are cached per file name and recomputed only when the file's
/// modification time changes.
#[derive(Debug)]
pub struct FileStore<F> {
    fs: F,
    cache: HashCache,
}

impl<F: FileSystem> FileStore<F> {
    /// Create a store over `fs` with an empty cache.
    #[must_use]
    pub fn new(fs: F) -> Self {
        Self {
            fs,
            cache: HashCache::new(),
        }
    }

    /// Backing file system.
    #[must_use]
    pub fn file_system(&self) -> &F {
        &self.fs
    }

    /// `ETag` cache.
    #[must_use]
    pub fn cache(&self) -> &HashCache {
        &self.cache
    }

    /// Build the response for `name` under `request`'s conditions.
    ///
    /// The response carries an `ETag` header and is otherwise produced by
    /// [`serve_content`].
    ///
    /// # Errors
    ///
    /// Returns a 404 [`HttpError`] if `name` does not exist or is a
    /// directory, and a 500 [`HttpError`] for any other I/O failure.
    pub fn send_file(&self, request: &RequestMeta, name: &str) -> Result<Response, HttpError> {
        let file = self.fs.open(name).map_err(open_error)?;
        let info = file.stat().map_err(HttpError::internal)?;
        if info.is_dir {
            return Err(HttpError::not_found());
        }

        let mut reader = seekable(file.into_reader()).map_err(HttpError::internal)?;
        let tag = self
            .etag(name, info.modified, &mut reader)
            .map_err(HttpError::internal)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            header::ETAG,
            HeaderValue::from_str(&tag).map_err(HttpError::internal)?,
        );
        serve_content(request, headers, name, info.modified, reader)
    }

    /// Cached tag for `name`, hashing `reader` on a miss.
    ///
    /// `reader` is left at its start either way.
    fn etag<R: Read + Seek>(
        &self,
        name: &str,
        modified: SystemTime,
        reader: &mut R,
    ) -> io::Result<String> {
        if let Some(entry) = self.cache.get(name)
            && entry.modified == modified
        {
            return Ok(entry.tag);
        }

        let tag = compute_etag(reader)?;
        reader.seek(SeekFrom::Start(0))?;
        tracing::debug!(name, tag, "Computed ETag");

        self.cache.put(
            name,
            CacheEntry {
                modified,
                tag: tag.clone(),
            },
        );
        Ok(tag)
    }
}

pub(crate) fn open_error(err: io::Error) -> HttpError {
    if err.kind() == io::ErrorKind::NotFound {
        HttpError::not_found()
    } else {
        HttpError::internal(err)
    }
}

/// Seekable view of a file's content; streams are buffered in memory.
fn seekable(reader: Reader) -> io::Result<Box<dyn ReadSeek + Send>> {
    match reader {
        Reader::Seekable(reader) => Ok(reader),
        Reader::Stream(mut stream) => {
            let mut data = Vec::new();
            stream.read_to_end(&mut data)?;
            Ok(Box::new(Cursor::new(data)))
        }
    }
}

#[cfg(test)]
mod tests {
    static_assertions::assert_impl_all!(super::FileStore<crate::DirFs>: Send, Sync);
    static_assertions::assert_impl_all!(super::FileStore<crate::MemoryFs>: Send, Sync);

    use std::fs;
    use std::time::{Duration, UNIX_EPOCH};

    use axum::body::to_bytes;
    use axum::http::StatusCode;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{DirFs, MemoryFs};

    const HELLO_TAG: &str = "\"2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824\"";

    fn create_store() -> (tempfile::TempDir, FileStore<DirFs>) {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("hello.txt"), "hello").unwrap();
        fs::create_dir(temp_dir.path().join("assets")).unwrap();
        let store = FileStore::new(DirFs::new(temp_dir.path()));
        (temp_dir, store)
    }

    fn etag_of(response: &Response) -> &str {
        response.headers()[header::ETAG].to_str().unwrap()
    }

    fn set_modified(path: &std::path::Path, secs: u64) {
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(UNIX_EPOCH + Duration::from_secs(secs))
            .unwrap();
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_send_file() {
        let (_temp_dir, store) = create_store();

        let response = store
            .send_file(&RequestMeta::default(), "hello.txt")
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(etag_of(&response), HELLO_TAG);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        assert_eq!(body_string(response).await, "hello");
    }

    #[test]
    fn test_etag_is_stable() {
        let (_temp_dir, store) = create_store();
        let request = RequestMeta::default();

        let first = store.send_file(&request, "hello.txt").unwrap();
        let second = store.send_file(&request, "hello.txt").unwrap();

        assert_eq!(etag_of(&first), etag_of(&second));
        assert_eq!(store.cache().len(), 1);
    }

    #[test]
    fn test_unchanged_file_uses_cached_tag() {
        let (_temp_dir, store) = create_store();
        let request = RequestMeta::default();
        store.send_file(&request, "hello.txt").unwrap();

        let entry = store.cache().get("hello.txt").unwrap();
        store.cache().put(
            "hello.txt",
            CacheEntry {
                modified: entry.modified,
                tag: "\"sentinel\"".to_owned(),
            },
        );
        let response = store.send_file(&request, "hello.txt").unwrap();

        assert_eq!(etag_of(&response), "\"sentinel\"");
    }

    #[test]
    fn test_changed_mtime_recomputes_tag() {
        let (temp_dir, store) = create_store();
        let path = temp_dir.path().join("hello.txt");
        let request = RequestMeta::default();
        set_modified(&path, 1_000_000);
        let first = store.send_file(&request, "hello.txt").unwrap();

        fs::write(&path, "hello, world").unwrap();
        set_modified(&path, 2_000_000);
        let second = store.send_file(&request, "hello.txt").unwrap();

        assert_ne!(etag_of(&first), etag_of(&second));
        assert_eq!(
            store.cache().get("hello.txt").unwrap().modified,
            UNIX_EPOCH + Duration::from_secs(2_000_000)
        );
    }

    #[test]
    fn test_changed_mtime_same_content_keeps_tag() {
        let (temp_dir, store) = create_store();
        let path = temp_dir.path().join("hello.txt");
        let request = RequestMeta::default();
        set_modified(&path, 1_000_000);
        let first = store.send_file(&request, "hello.txt").unwrap();

        set_modified(&path, 2_000_000);
        let second = store.send_file(&request, "hello.txt").unwrap();

        assert_eq!(etag_of(&first), etag_of(&second));
    }

    #[test]
    fn test_concurrent_distinct_files() {
        const FILES: usize = 16;

        let (temp_dir, store) = create_store();
        for i in 0..FILES {
            fs::write(temp_dir.path().join(format!("f{i}.txt")), format!("file {i}")).unwrap();
        }

        std::thread::scope(|s| {
            for i in 0..FILES {
                let store = &store;
                s.spawn(move || {
                    store
                        .send_file(&RequestMeta::default(), &format!("f{i}.txt"))
                        .unwrap();
                });
            }
        });

        assert_eq!(store.cache().len(), FILES);
        for i in 0..FILES {
            let name = format!("f{i}.txt");
            let actual = fs::metadata(temp_dir.path().join(&name))
                .unwrap()
                .modified()
                .unwrap();
            assert_eq!(store.cache().get(&name).unwrap().modified, actual);
        }
    }

    #[test]
    fn test_if_none_match_returns_not_modified() {
        let (_temp_dir, store) = create_store();
        let request = RequestMeta::default().with_header(header::IF_NONE_MATCH, HELLO_TAG);

        let response = store.send_file(&request, "hello.txt").unwrap();

        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(etag_of(&response), HELLO_TAG);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let (_temp_dir, store) = create_store();

        let err = store
            .send_file(&RequestMeta::default(), "missing.txt")
            .unwrap_err();

        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert!(store.cache().is_empty());
    }

    #[test]
    fn test_directory_is_not_found() {
        let (_temp_dir, store) = create_store();

        let err = store
            .send_file(&RequestMeta::default(), "assets")
            .unwrap_err();

        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_parent_dir_is_internal_error() {
        let (_temp_dir, store) = create_store();

        let err = store
            .send_file(&RequestMeta::default(), "../hello.txt")
            .unwrap_err();

        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_stream_only_file_system() {
        let modified = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let store = FileStore::new(MemoryFs::new().with_file("hello.txt", "hello", modified));

        let response = store
            .send_file(&RequestMeta::default(), "/hello.txt")
            .unwrap();

        assert_eq!(etag_of(&response), HELLO_TAG);
        assert_eq!(body_string(response).await, "hello");
    }

    #[tokio::test]
    async fn test_range_on_stream_only_file() {
        let modified = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let store = FileStore::new(MemoryFs::new().with_file("hello.txt", "hello", modified));
        let request = RequestMeta::default().with_header(header::RANGE, "bytes=1-3");

        let response = store.send_file(&request, "hello.txt").unwrap();

        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 1-3/5");
        assert_eq!(body_string(response).await, "ell");
    }

    #[test]
    fn test_memory_directory_is_not_found() {
        let store = FileStore::new(MemoryFs::new().with_file("docs/a.txt", "a", UNIX_EPOCH));

        let err = store
            .send_file(&RequestMeta::default(), "docs")
            .unwrap_err();

        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }
}
