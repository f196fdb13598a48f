//! Persistence layer: named string blobs.
//!
//! # Responsibility
//! - Define the storage contract the listing store depends on.
//! - Provide in-memory, file and SQLite implementations.
//!
//! # Invariants
//! - `get_blob` distinguishes "absent" (`Ok(None)`) from read failures.
//! - `set_blob` either stores the whole value or reports an error; readers
//!   never observe a partially written blob.
//! - Keys match `[A-Za-z0-9_.-]+` and are not `.`/`..`.

use crate::db::DbError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod file_store;
pub mod memory_store;
pub mod sqlite_store;

pub use file_store::FileBlobStore;
pub use memory_store::MemoryBlobStore;
pub use sqlite_store::SqliteBlobStore;

static STORAGE_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("valid storage key regex"));

pub type StorageResult<T> = Result<T, StorageError>;

/// Failure reported by a blob store backend.
#[derive(Debug)]
pub enum StorageError {
    /// Key is empty or contains characters outside the allowed set.
    InvalidKey(String),
    Io(std::io::Error),
    Db(DbError),
    /// Backend refused the operation (quota, read-only medium, ...).
    Unavailable(String),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidKey(key) => write!(f, "invalid storage key `{key}`"),
            Self::Io(err) => write!(f, "storage i/o failure: {err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Unavailable(reason) => write!(f, "storage unavailable: {reason}"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::InvalidKey(_) | Self::Unavailable(_) => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<DbError> for StorageError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Synchronous key/blob storage used by the listing store.
pub trait BlobStore {
    /// Reads the blob stored under `key`, `None` when nothing was written yet.
    fn get_blob(&self, key: &str) -> StorageResult<Option<String>>;
    /// Replaces the blob stored under `key`.
    fn set_blob(&mut self, key: &str, value: &str) -> StorageResult<()>;
}

impl<S: BlobStore + ?Sized> BlobStore for Box<S> {
    fn get_blob(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get_blob(key)
    }

    fn set_blob(&mut self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set_blob(key, value)
    }
}

/// Returns whether `key` can be used with every backend.
pub fn is_valid_storage_key(key: &str) -> bool {
    key != "." && key != ".." && STORAGE_KEY_RE.is_match(key)
}

pub(crate) fn ensure_valid_key(key: &str) -> StorageResult<()> {
    if is_valid_storage_key(key) {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}
