//! Flat on-disk cache of attachment payloads.
//!
//! One file per message id, raw bytes, no extension. Presence of the file is
//! the only hit signal: once a payload is written for a message it is served
//! from disk forever and the source is never asked for it again.
//!
//! The one exception is an entry that exists but cannot be read (permissions,
//! a directory in its place). It is treated as a miss: the payload is fetched
//! again and the entry rewritten if possible, so a damaged cache never blanks
//! the slideshow.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use crate::error::{FrameError, Result};
use crate::events::MessageId;

/// Where a payload returned by [`AttachmentStore::get`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobOrigin {
    /// Read from disk; the fetcher was not invoked.
    Cache,
    /// Fetched through the caller's fetcher. `persisted` is false when the
    /// cache write failed and the bytes are only held in memory.
    Fetched { persisted: bool },
}

#[derive(Debug, Clone)]
pub struct CachedBlob {
    pub bytes: Vec<u8>,
    pub origin: BlobOrigin,
}

#[derive(Debug)]
pub struct AttachmentStore {
    root: PathBuf,
    root_ready: AtomicBool,
}

impl AttachmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            root_ready: AtomicBool::new(false),
        }
    }

    pub fn contains(&self, message_id: &MessageId) -> bool {
        self.entry_path(message_id)
            .map(|path| path.is_file())
            .unwrap_or(false)
    }

    /// Returns the payload cached for `message_id`, calling `fetcher` only on
    /// a miss. A failed cache write is logged and the fetched bytes are still
    /// returned.
    pub fn get<F>(&self, message_id: &MessageId, fetcher: F) -> Result<CachedBlob>
    where
        F: FnOnce() -> Result<Vec<u8>>,
    {
        let path = self.entry_path(message_id)?;
        if let Err(err) = self.ensure_root() {
            warn!(
                root = %self.root.display(),
                error = %err,
                "attachment cache directory unavailable"
            );
        }

        match fs::read(&path) {
            Ok(bytes) => {
                debug!(message_id = %message_id, bytes = bytes.len(), "attachment cache hit");
                return Ok(CachedBlob {
                    bytes,
                    origin: BlobOrigin::Cache,
                });
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!(
                    message_id = %message_id,
                    path = %path.display(),
                    error = %err,
                    "unreadable cache entry; treating as a miss"
                );
            }
        }

        debug!(message_id = %message_id, "attachment cache miss; fetching");
        let bytes = fetcher().map_err(|err| FrameError::FetchFailed {
            message_id: message_id.clone(),
            reason: err.to_string(),
        })?;

        let persisted = match self.persist(&path, &bytes) {
            Ok(()) => true,
            Err(err) => {
                warn!(message_id = %message_id, error = %err, "serving attachment without caching it");
                false
            }
        };

        Ok(CachedBlob {
            bytes,
            origin: BlobOrigin::Fetched { persisted },
        })
    }

    fn entry_path(&self, message_id: &MessageId) -> Result<PathBuf> {
        if !message_id.is_path_safe() {
            return Err(FrameError::InvalidMessageId(message_id.as_str().to_owned()));
        }
        Ok(self.root.join(message_id.as_str()))
    }

    fn ensure_root(&self) -> io::Result<()> {
        if self.root_ready.load(Ordering::Acquire) {
            return Ok(());
        }
        fs::create_dir_all(&self.root)?;
        self.root_ready.store(true, Ordering::Release);
        Ok(())
    }

    // Write to a hidden sibling then rename so a torn write never reads as a hit.
    fn persist(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let write_failed = |source| FrameError::CacheWriteFailed {
            path: path.to_path_buf(),
            source,
        };
        self.ensure_root().map_err(write_failed)?;

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let staging = self.root.join(format!(".{file_name}.part"));
        if let Err(err) = fs::write(&staging, bytes).and_then(|_| fs::rename(&staging, path)) {
            let _ = fs::remove_file(&staging);
            return Err(write_failed(err));
        }
        debug!(path = %path.display(), bytes = bytes.len(), "attachment cached");
        Ok(())
    }
}
