//! Keyed file cache for analysis results
//!
//! Reprocessing an identical document through the analysis workflow is
//! expensive, so results are cached on disk keyed by a SHA-256 over the file
//! name and content. Entries live in `<cache_dir>/<key>.json` and expire lazily: an
//! entry older than the TTL is deleted when it is next read.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// One cached analysis result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub file_name: String,
    /// Unix seconds at write time.
    pub timestamp: i64,
    pub result: JsonValue,
}

#[derive(Clone)]
pub struct ResultCache {
    dir: PathBuf,
    ttl: Duration,
}

impl ResultCache {
    pub async fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create cache directory {}", dir.display()))?;
        Ok(Self { dir, ttl })
    }

    /// Cache key for a document: hex SHA-256 over the file name and its
    /// content, so a renamed copy gets its own entry.
    pub fn key_for(file_name: &str, content: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(file_name.as_bytes());
        hasher.update([0u8]);
        hasher.update(content);
        hex::encode(hasher.finalize())
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        let age = Utc::now().timestamp().saturating_sub(entry.timestamp);
        age >= 0 && age as u64 > self.ttl.as_secs()
    }

    /// Look up a cached result. Expired entries are removed on read and
    /// reported as a miss. A corrupt entry is treated the same way so one
    /// bad file cannot wedge the pipeline.
    pub async fn get(&self, key: &str) -> Option<JsonValue> {
        let path = self.entry_path(key);
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to read cache entry");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_slice(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(key, error = %e, "Removing corrupt cache entry");
                let _ = fs::remove_file(&path).await;
                return None;
            }
        };

        if self.is_expired(&entry) {
            tracing::debug!(key, "Cache entry expired");
            let _ = fs::remove_file(&path).await;
            return None;
        }

        tracing::debug!(key, file_name = %entry.file_name, "Cache hit");
        Some(entry.result)
    }

    pub async fn put(&self, key: &str, file_name: &str, result: &JsonValue) -> Result<()> {
        let entry = CacheEntry {
            file_name: file_name.to_string(),
            timestamp: Utc::now().timestamp(),
            result: result.clone(),
        };
        let raw = serde_json::to_vec(&entry).context("Failed to serialize cache entry")?;
        let path = self.entry_path(key);
        fs::write(&path, raw)
            .await
            .with_context(|| format!("Failed to write cache entry {}", path.display()))?;
        Ok(())
    }

    /// Sweep expired entries. Returns how many were removed.
    pub async fn clean(&self) -> Result<usize> {
        let mut removed = 0;
        let mut entries = fs::read_dir(&self.dir)
            .await
            .with_context(|| format!("Failed to read cache directory {}", self.dir.display()))?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !is_cache_file(&path) {
                continue;
            }
            let expired = match fs::read(&path).await {
                Ok(raw) => match serde_json::from_slice::<CacheEntry>(&raw) {
                    Ok(parsed) => self.is_expired(&parsed),
                    // Corrupt entries count as expired
                    Err(_) => true,
                },
                Err(_) => continue,
            };
            if expired && fs::remove_file(&path).await.is_ok() {
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::info!(removed, "Cleaned expired cache entries");
        }
        Ok(removed)
    }

    /// Drop every entry. Returns how many were removed.
    pub async fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        let mut entries = fs::read_dir(&self.dir)
            .await
            .with_context(|| format!("Failed to read cache directory {}", self.dir.display()))?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if is_cache_file(&path) && fs::remove_file(&path).await.is_ok() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn is_cache_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    async fn test_cache(ttl: Duration) -> (TempDir, ResultCache) {
        let dir = TempDir::new().unwrap();
        let cache = ResultCache::new(dir.path(), ttl).await.unwrap();
        (dir, cache)
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let (_dir, cache) = test_cache(Duration::from_secs(3600)).await;
        let key = ResultCache::key_for("report.pdf", b"document content");

        assert!(cache.get(&key).await.is_none());
        cache
            .put(&key, "report.pdf", &json!({"summary": "ok"}))
            .await
            .unwrap();
        assert_eq!(cache.get(&key).await, Some(json!({"summary": "ok"})));
    }

    #[tokio::test]
    async fn test_key_is_content_addressed() {
        let a = ResultCache::key_for("a.pdf", b"same bytes");
        let b = ResultCache::key_for("a.pdf", b"same bytes");
        let c = ResultCache::key_for("a.pdf", b"different bytes");
        let d = ResultCache::key_for("b.pdf", b"same bytes");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn test_expired_entry_is_removed_on_read() {
        let (dir, cache) = test_cache(Duration::from_secs(0)).await;
        let key = ResultCache::key_for("old.pdf", b"old content");

        // Backdate the entry so it is past the TTL.
        let entry = CacheEntry {
            file_name: "old.pdf".to_string(),
            timestamp: Utc::now().timestamp() - 10,
            result: json!({"summary": "stale"}),
        };
        let path = dir.path().join(format!("{key}.json"));
        std::fs::write(&path, serde_json::to_vec(&entry).unwrap()).unwrap();

        assert!(cache.get(&key).await.is_none());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_a_miss() {
        let (dir, cache) = test_cache(Duration::from_secs(3600)).await;
        let key = ResultCache::key_for("x.pdf", b"whatever");
        let path = dir.path().join(format!("{key}.json"));
        std::fs::write(&path, b"not json").unwrap();

        assert!(cache.get(&key).await.is_none());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_clean_removes_only_expired() {
        let (dir, cache) = test_cache(Duration::from_secs(3600)).await;

        let fresh_key = ResultCache::key_for("fresh.pdf", b"fresh");
        cache.put(&fresh_key, "fresh.pdf", &json!(1)).await.unwrap();

        let stale_key = ResultCache::key_for("stale.pdf", b"stale");
        let stale = CacheEntry {
            file_name: "stale.pdf".to_string(),
            timestamp: Utc::now().timestamp() - 7200,
            result: json!(2),
        };
        std::fs::write(
            dir.path().join(format!("{stale_key}.json")),
            serde_json::to_vec(&stale).unwrap(),
        )
        .unwrap();

        assert_eq!(cache.clean().await.unwrap(), 1);
        assert!(cache.get(&fresh_key).await.is_some());
        assert!(cache.get(&stale_key).await.is_none());
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let (_dir, cache) = test_cache(Duration::from_secs(3600)).await;
        for content in [b"one".as_slice(), b"two", b"three"] {
            let key = ResultCache::key_for("f.pdf", content);
            cache.put(&key, "f", &json!("r")).await.unwrap();
        }
        assert_eq!(cache.clear().await.unwrap(), 3);
        assert_eq!(cache.clear().await.unwrap(), 0);
    }
}
