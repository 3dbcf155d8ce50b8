//! On-disk cache tier
//!
//! One JSON file per key under a single directory. No TTL: entries live until
//! deleted, cleared, or overwritten. This is the tier that survives process
//! restarts.

use async_trait::async_trait;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use super::tier::{CacheTier, TierResult};

const FILE_EXTENSION: &str = "json";

/// Map a cache key to a safe file stem.
///
/// Every character outside `[A-Za-z0-9]` becomes `_`, so keys can never
/// contain path separators, `..`, or leading dots.
pub fn sanitize_key(key: &str) -> String {
    let sanitized: String = key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();

    if sanitized.is_empty() {
        "_".to_string()
    } else {
        sanitized
    }
}

/// File-per-key cache tier
pub struct DiskTier {
    dir: PathBuf,
    /// Distinguishes temp files of concurrent writers
    write_seq: AtomicU64,
}

impl DiskTier {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_seq: AtomicU64::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", sanitize_key(key), FILE_EXTENSION))
    }
}

#[async_trait]
impl CacheTier for DiskTier {
    fn name(&self) -> &'static str {
        "disk"
    }

    async fn get(&self, key: &str) -> TierResult<Option<Value>> {
        let raw = match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(serde_json::from_str(&raw)?))
    }

    async fn set(&self, key: &str, value: &Value) -> TierResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let target = self.path_for(key);
        let seq = self.write_seq.fetch_add(1, Ordering::Relaxed);
        let temp = self.dir.join(format!(
            ".{}.{}.{}.tmp",
            sanitize_key(key),
            std::process::id(),
            seq
        ));

        let body = serde_json::to_vec(value)?;
        tokio::fs::write(&temp, body).await?;

        // Rename is atomic on the same filesystem, so readers never see a
        // half-written file.
        if let Err(e) = tokio::fs::rename(&temp, &target).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> TierResult<()> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn clear(&self) -> TierResult<()> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some(FILE_EXTENSION) {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }

        Ok(())
    }
}
