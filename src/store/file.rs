use super::Store;
use crate::error::StoreError;
use crate::models::CacheEntry;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Longest key stored under its hex name. Hex doubles the length and the temp
/// suffix must still fit in a 255-byte file name.
const MAX_HEX_KEY_BYTES: usize = 100;

/// One JSON file per key under a cache directory.
///
/// Writes go to a unique temp file first and are renamed into place, so a
/// concurrent reader never sees a partially written entry.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    tmp_seq: AtomicU64,
}

impl FileStore {
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| StoreError::Io {
                key: String::new(),
                path: dir.clone(),
                source,
            })?;
        debug!(dir = %dir.display(), "Opened file cache store");
        Ok(Self {
            dir,
            tmp_seq: AtomicU64::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Short keys are hex-encoded so any string maps to a portable file name.
    /// Longer keys are named by their SHA-256 digest; `get` then checks the
    /// stored key so a digest collision reads as a miss.
    fn entry_path(&self, key: &str) -> PathBuf {
        let mut name = if key.len() <= MAX_HEX_KEY_BYTES {
            hex(key.as_bytes())
        } else {
            format!("sha256-{}", hex(&Sha256::digest(key.as_bytes())))
        };
        name.push_str(".json");
        self.dir.join(name)
    }

    fn tmp_path(&self, path: &Path) -> PathBuf {
        let seq = self.tmp_seq.fetch_add(1, Ordering::Relaxed);
        path.with_extension(format!("json.tmp-{}-{}", std::process::id(), seq))
    }
}

#[async_trait]
impl Store for FileStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, StoreError> {
        let path = self.entry_path(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Io {
                    key: key.to_string(),
                    path,
                    source,
                })
            }
        };

        // Only external tampering can leave a bad file behind; the next set
        // overwrites it.
        match serde_json::from_slice::<CacheEntry>(&bytes) {
            Ok(entry) if entry.key == key => Ok(Some(entry)),
            Ok(entry) => {
                warn!(key, stored = %entry.key, "Cache file holds another key");
                Ok(None)
            }
            Err(e) => {
                warn!(key, path = %path.display(), error = %e, "Ignoring unreadable cache entry");
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, entry: CacheEntry) -> Result<(), StoreError> {
        let path = self.entry_path(key);
        let json = serde_json::to_vec(&entry).map_err(|source| StoreError::Serialization {
            key: key.to_string(),
            source,
        })?;

        let tmp = self.tmp_path(&path);
        let io_err = |path: &Path, source: std::io::Error| StoreError::Io {
            key: key.to_string(),
            path: path.to_path_buf(),
            source,
        };

        if let Err(source) = tokio::fs::write(&tmp, &json).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_err(tmp.as_path(), source));
        }

        if let Err(source) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_err(path.as_path(), source));
        }

        debug!(key, path = %path.display(), "Wrote cache entry");
        Ok(())
    }
}

fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}
