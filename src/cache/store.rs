// Raw byte storage for cache entries.
// One file per entry, named by hashed key, with the file mtime as the recency signal.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tempfile::Builder;

use crate::error::Result;

/// A file found in the cache directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredEntry {
    /// Filename inside the cache directory (normally a hashed key).
    pub name: String,
    /// Payload size in bytes.
    pub size: u64,
    /// Last-modified time, used as the last-access time.
    pub last_modified: DateTime<Utc>,
}

/// Byte-level store rooted at a single directory.
///
/// The directory listing plus per-file mtime is the whole catalog; nothing
/// is kept in memory.
#[derive(Debug, Clone)]
pub struct BlobStore {
    dir: PathBuf,
}

impl BlobStore {
    /// Create a store, attempting to create its directory.
    ///
    /// Never fails; use [`BlobStore::is_writable`] or the result of
    /// [`BlobStore::ensure_dir`] to detect an unusable store.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let store = Self { dir: dir.into() };
        let _ = store.ensure_dir();
        store
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the directory tree if missing. Idempotent.
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    /// Whether the current process can create files in the directory.
    ///
    /// Creates and drops an anonymous temp file, so ownership and ACLs are
    /// taken into account, not just the mode bits.
    pub fn is_writable(&self) -> bool {
        self.dir.is_dir() && tempfile::tempfile_in(&self.dir).is_ok()
    }

    /// Path of the file backing `hashed_key`.
    pub fn path_for(&self, hashed_key: &str) -> PathBuf {
        self.dir.join(hashed_key)
    }

    /// Replace the content stored under `hashed_key` with `bytes`.
    ///
    /// Bytes go to a uniquely named temp file in the same directory which is
    /// then renamed over the target, so readers see either the old or the new
    /// payload and never a partial one. On failure the temp file is removed
    /// and any previous entry is left as it was.
    pub fn write(&self, hashed_key: &str, bytes: &[u8]) -> Result<()> {
        self.ensure_dir()?;

        let mut builder = Builder::new();
        #[cfg(unix)]
        {
            // Same mode as a plain create (0666 minus umask) instead of 0600
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(fs::Permissions::from_mode(0o666));
        }
        let mut temp = builder.tempfile_in(&self.dir)?;
        temp.write_all(bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(self.path_for(hashed_key)).map_err(|e| e.error)?;

        Ok(())
    }

    /// Read the content stored under `hashed_key`. A missing file is `Ok(None)`.
    pub fn read(&self, hashed_key: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(hashed_key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether a file exists for `hashed_key`.
    pub fn exists(&self, hashed_key: &str) -> bool {
        self.path_for(hashed_key).is_file()
    }

    /// Set the entry's last-modified time to now.
    pub fn touch(&self, hashed_key: &str) -> Result<()> {
        self.touch_at(hashed_key, SystemTime::now())
    }

    /// Set the entry's last-modified time without changing its content.
    pub fn touch_at(&self, hashed_key: &str, time: SystemTime) -> Result<()> {
        // Write access is needed for the timestamp update on some platforms;
        // the file is neither created nor truncated.
        let file = File::options().write(true).open(self.path_for(hashed_key))?;
        file.set_modified(time)?;
        Ok(())
    }

    /// Last-modified time of an entry, if it exists.
    pub fn last_modified(&self, hashed_key: &str) -> Result<Option<DateTime<Utc>>> {
        match fs::metadata(self.path_for(hashed_key)) {
            Ok(meta) => Ok(Some(meta.modified()?.into())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// All regular files directly inside the directory.
    ///
    /// Entries removed while the listing runs are skipped. A missing
    /// directory yields an empty listing.
    pub fn list_entries(&self) -> Result<Vec<StoredEntry>> {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        for dir_entry in read_dir {
            let Ok(dir_entry) = dir_entry else {
                continue;
            };
            let Ok(meta) = dir_entry.metadata() else {
                continue;
            };
            if !meta.is_file() {
                continue;
            }
            let Ok(name) = dir_entry.file_name().into_string() else {
                continue;
            };
            let Ok(modified) = meta.modified() else {
                continue;
            };

            entries.push(StoredEntry {
                name,
                size: meta.len(),
                last_modified: modified.into(),
            });
        }

        Ok(entries)
    }

    /// Remove an entry. Removing a missing entry succeeds.
    pub fn delete(&self, hashed_key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(hashed_key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
