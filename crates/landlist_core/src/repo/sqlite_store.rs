//! SQLite-backed blob store.
//!
//! # Invariants
//! - Blobs live in the `blobs` table keyed by storage key.
//! - `set_blob` is a single upsert statement, atomic under SQLite.

use super::{ensure_valid_key, BlobStore, StorageResult};
use crate::db::{open_db, open_db_in_memory};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

pub struct SqliteBlobStore {
    conn: Connection,
}

impl SqliteBlobStore {
    /// Opens a database file, creating and upgrading its schema as needed.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        Ok(Self {
            conn: open_db(path)?,
        })
    }

    pub fn open_in_memory() -> StorageResult<Self> {
        Ok(Self {
            conn: open_db_in_memory()?,
        })
    }

    /// Epoch millis of the last write to `key`.
    pub fn updated_at(&self, key: &str) -> StorageResult<Option<i64>> {
        ensure_valid_key(key)?;
        Ok(self
            .conn
            .query_row(
                "SELECT updated_at FROM blobs WHERE key = ?1;",
                [key],
                |row| row.get(0),
            )
            .optional()?)
    }
}

impl BlobStore for SqliteBlobStore {
    fn get_blob(&self, key: &str) -> StorageResult<Option<String>> {
        ensure_valid_key(key)?;
        Ok(self
            .conn
            .query_row("SELECT value FROM blobs WHERE key = ?1;", [key], |row| {
                row.get(0)
            })
            .optional()?)
    }

    fn set_blob(&mut self, key: &str, value: &str) -> StorageResult<()> {
        ensure_valid_key(key)?;
        self.conn.execute(
            "INSERT INTO blobs (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key, value, Utc::now().timestamp_millis()],
        )?;
        Ok(())
    }
}
