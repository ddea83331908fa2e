//! Disk-backed cache of raw provider responses.
//!
//! One JSON document per file, keyed by a caller-derived relative path that
//! embeds league, season and entity id. An entry is reused while its age is
//! within the staleness threshold; a corrupt or incomplete entry is evicted
//! and treated as a miss. Fetch results that fail the per-entity completeness
//! predicate are never persisted, so an interrupted run resumes cleanly.

use std::future::Future;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use thiserror::Error;

/// Frequently-changing documents: match lists, standings, season rosters.
pub fn fast_moving() -> Duration {
    Duration::days(5)
}

/// Slowly-changing entity profiles (players, teams, managers, venues).
pub fn profile() -> Duration {
    Duration::days(30)
}

/// Image assets.
pub fn images() -> Duration {
    Duration::days(90)
}

/// Documents that never change once complete (season fixture files,
/// finished-match reports).
pub fn immutable() -> Duration {
    Duration::MAX
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to write cache entry {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result of a cache-or-fetch operation.
#[derive(Debug)]
pub enum CacheOutcome {
    /// Served from disk without invoking the fetcher.
    Hit(Value),
    /// Fetched, persisted, and returned.
    Fetched(Value),
    /// The fetch failed or returned an incomplete document; nothing cached.
    Missing,
}

impl CacheOutcome {
    pub fn into_value(self) -> Option<Value> {
        match self {
            CacheOutcome::Hit(v) | CacheOutcome::Fetched(v) => Some(v),
            CacheOutcome::Missing => None,
        }
    }
}

/// An entry strictly older than its threshold must be refreshed; an entry
/// aged exactly at the threshold is still fresh.
pub fn is_stale(age: Duration, max_age: Duration) -> bool {
    age > max_age
}

#[derive(Debug, Clone)]
pub struct JsonCache {
    root: PathBuf,
}

impl JsonCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of an entry.
    pub fn entry_path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Age of an entry, if it exists on disk.
    fn entry_age(&self, rel: &str) -> Option<Duration> {
        let meta = std::fs::metadata(self.entry_path(rel)).ok()?;
        let modified: DateTime<Utc> = meta.modified().ok()?.into();
        Some(Utc::now() - modified)
    }

    /// Parse an entry from disk. A file that is not valid JSON is removed so
    /// the next fetch overwrites it. The flatten phase reads through this
    /// too, so it never sees half-written documents.
    pub fn load(&self, rel: &str) -> Option<Value> {
        let path = self.entry_path(rel);
        let text = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(_) => {
                eprintln!("Evicting corrupt cache entry {}", path.display());
                let _ = std::fs::remove_file(&path);
                None
            }
        }
    }

    fn store(&self, rel: &str, value: &Value) -> Result<(), CacheError> {
        let path = self.entry_path(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| CacheError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let text = serde_json::to_string(value).expect("serde_json::Value always serializes");
        std::fs::write(&path, text).map_err(|source| CacheError::Write { path, source })
    }

    fn evict(&self, rel: &str) {
        let _ = std::fs::remove_file(self.entry_path(rel));
    }

    /// Serve `rel` from disk when present, fresh, and complete; otherwise run
    /// `fetch` and persist its result only when `looks_complete` accepts it.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        rel: &str,
        max_age: Duration,
        looks_complete: impl Fn(&Value) -> bool,
        fetch: F,
    ) -> Result<CacheOutcome>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<Value>>,
    {
        if let Some(age) = self.entry_age(rel) {
            if !is_stale(age, max_age) {
                if let Some(value) = self.load(rel) {
                    if looks_complete(&value) {
                        return Ok(CacheOutcome::Hit(value));
                    }
                    // Shape check failed: a partial write from an interrupted
                    // run. Evict so the fetch below overwrites it.
                    self.evict(rel);
                }
            }
        }

        let Some(value) = fetch().await else {
            return Ok(CacheOutcome::Missing);
        };
        if !looks_complete(&value) {
            return Ok(CacheOutcome::Missing);
        }
        self.store(rel, &value)
            .with_context(|| format!("Failed to persist cache entry {rel}"))?;
        Ok(CacheOutcome::Fetched(value))
    }
}
