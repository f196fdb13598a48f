//! Filesystem blob store.
//!
//! Each key maps to `<root>/<key>.json`. Writes go to a sibling temp file
//! that is renamed over the target, so a crash mid-write leaves the previous
//! blob intact.

use super::{ensure_valid_key, BlobStore, StorageResult};
use log::debug;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct FileBlobStore {
    root_dir: PathBuf,
}

impl FileBlobStore {
    /// Creates a store rooted at `root_dir`. The directory is created lazily.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Path of the file backing `key`.
    pub fn blob_path(&self, key: &str) -> PathBuf {
        self.root_dir.join(format!("{key}.json"))
    }
}

impl BlobStore for FileBlobStore {
    fn get_blob(&self, key: &str) -> StorageResult<Option<String>> {
        ensure_valid_key(key)?;
        match fs::read_to_string(self.blob_path(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set_blob(&mut self, key: &str, value: &str) -> StorageResult<()> {
        ensure_valid_key(key)?;
        fs::create_dir_all(&self.root_dir)?;

        let path = self.blob_path(key);
        let tmp = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;

        debug!(
            "event=blob_write module=repo backend=file key={key} bytes={}",
            value.len()
        );
        Ok(())
    }
}
