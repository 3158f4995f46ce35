//! File serving for Weft.
//!
//! This crate provides:
//! - [`FileSystem`]: the read-only file system contract, with [`DirFs`]
//!   (an OS directory tree) and [`MemoryFs`] (in-memory, stream-only)
//! - [`HashCache`]: content-hash `ETag`s keyed by file name and
//!   invalidated by modification time
//! - [`FileStore`]: conditional file responses with cached `ETag`s
//! - [`send_path`]: conditional response for one OS path, without `ETag`
//!
//! # Example
//!
//! ```no_run
//! use weft_files::{DirFs, FileStore};
//! use weft_http::RequestMeta;
//!
//! let store = FileStore::new(DirFs::new("public"));
//! let response = store.send_file(&RequestMeta::default(), "css/site.css");
//! ```

mod cache;
mod dir;
mod fs;
mod memory;
mod path;
mod store;

pub use cache::{CacheEntry, HashCache, compute_etag};
pub use dir::{DirFs, InvalidPath};
pub use fs::{File, FileInfo, FileSystem, ReadSeek, Reader};
pub use memory::MemoryFs;
pub use path::send_path;
pub use store::FileStore;
