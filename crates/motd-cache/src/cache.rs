//! File-based envelope cache
//!
//! Entries are independent files directly under the cache directory. New
//! entries are written and synced under `.staging/` and renamed into place,
//! so a reader never observes a partially written file. The filesystem is the
//! only synchronization between ingest, read and trim.

use crate::error::{CacheError, Result, StorageStage};
use crate::types::{CacheEntry, CacheStats, TrimReport};
use chrono::{DateTime, TimeZone, Utc};
use rand::rngs::OsRng;
use rand::Rng;
use reqwest::Client;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::SystemTime;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};
use url::Url;

/// Subdirectory holding entries that are still being written
pub const STAGING_DIR: &str = ".staging";

/// A listed cache file with the metadata retention needs
#[derive(Debug)]
struct ListedEntry {
    path: PathBuf,
    modified: SystemTime,
    len: u64,
}

/// Bounded directory of envelope files
pub struct CacheStore {
    /// Directory where entries are published
    cache_dir: PathBuf,
    /// Directory where entries are written before publishing
    staging_dir: PathBuf,
    /// HTTP client used by `ingest`
    client: Client,
    /// Last creation stamp handed out, in unix nanoseconds
    last_stamp: AtomicI64,
}

impl CacheStore {
    /// Create a store over `cache_dir` with a default HTTP client
    pub fn new(cache_dir: PathBuf) -> Self {
        Self::with_client(cache_dir, Client::new())
    }

    /// Create a store that downloads with `client`, e.g. one with custom timeouts
    pub fn with_client(cache_dir: PathBuf, client: Client) -> Self {
        let staging_dir = cache_dir.join(STAGING_DIR);
        Self {
            cache_dir,
            staging_dir,
            client,
            last_stamp: AtomicI64::new(0),
        }
    }

    /// Directory entries are published to
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Create the cache directory and clear out leftovers from interrupted writes
    pub async fn init(&self) -> Result<()> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(0o700);
        builder
            .create(&self.staging_dir)
            .await
            .map_err(|e| CacheError::storage(StorageStage::CreateDir, &self.staging_dir, e))?;

        let mut stale = fs::read_dir(&self.staging_dir)
            .await
            .map_err(|e| CacheError::storage(StorageStage::List, &self.staging_dir, e))?;
        while let Some(entry) = stale
            .next_entry()
            .await
            .map_err(|e| CacheError::storage(StorageStage::List, &self.staging_dir, e))?
        {
            if let Err(e) = fs::remove_file(entry.path()).await {
                warn!(file = ?entry.path(), error = %e, "Failed to remove stale staging file");
            }
        }

        info!(cache_dir = ?self.cache_dir, "Cache initialized");
        Ok(())
    }

    /// Strictly increasing creation stamp, so names never collide within one store
    fn next_stamp(&self) -> DateTime<Utc> {
        let now = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);
        let mut last = self.last_stamp.load(Ordering::Relaxed);
        loop {
            let next = now.max(last.saturating_add(1));
            match self
                .last_stamp
                .compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return Utc.timestamp_nanos(next),
                Err(actual) => last = actual,
            }
        }
    }

    /// Download `url` and store it as a new entry.
    ///
    /// Returns the path of the published file.
    pub async fn ingest(&self, url: &str, caption: Option<&str>) -> Result<PathBuf> {
        let parsed = Url::parse(url).map_err(|e| CacheError::InvalidUrl(format!("{}: {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(CacheError::InvalidUrl(format!(
                "{}: unsupported scheme {}",
                url,
                parsed.scheme()
            )));
        }

        info!(url, caption, "Caching content");

        let response = self.client.get(parsed).send().await?.error_for_status()?;
        let payload = response.bytes().await?.to_vec();

        self.store(url, payload, caption).await
    }

    /// Encode already-fetched bytes and publish them as a new entry
    pub async fn store(&self, url: &str, payload: Vec<u8>, caption: Option<&str>) -> Result<PathBuf> {
        let entry = CacheEntry::new(url, payload, caption, self.next_stamp());
        let name = entry.file_name();
        let staged = self.staging_dir.join(&name);
        let target = self.cache_dir.join(&name);

        if let Err(e) = write_synced(&staged, entry.envelope().as_bytes()).await {
            let _ = fs::remove_file(&staged).await;
            return Err(e);
        }

        let collision = match fs::try_exists(&target).await {
            Ok(false) => None,
            Ok(true) => Some(io::Error::from(io::ErrorKind::AlreadyExists)),
            Err(e) => Some(e),
        };
        if let Some(e) = collision {
            let _ = fs::remove_file(&staged).await;
            return Err(CacheError::storage(StorageStage::Publish, &target, e));
        }

        if let Err(e) = fs::rename(&staged, &target).await {
            let _ = fs::remove_file(&staged).await;
            return Err(CacheError::storage(StorageStage::Publish, &target, e));
        }
        sync_dir(&self.cache_dir).await?;

        debug!(file = ?target, size = entry.payload.len(), "Cached content");
        Ok(target)
    }

    /// Contents of one entry chosen uniformly at random
    pub async fn get_random(&self) -> Result<Vec<u8>> {
        let files = self.list_files().await?;
        if files.is_empty() {
            return Err(CacheError::EmptyCache);
        }

        let index = OsRng.gen_range(0..files.len());
        let path = &files[index];
        fs::read(path)
            .await
            .map_err(|e| CacheError::storage(StorageStage::Read, path, e))
    }

    /// Delete the oldest entries so that at most `max_files` remain.
    ///
    /// Individual deletion failures are logged and reported but do not stop
    /// the sweep.
    pub async fn trim(&self, max_files: usize) -> Result<TrimReport> {
        let mut entries = self.list_entries().await?;
        let mut report = TrimReport {
            scanned: entries.len(),
            ..TrimReport::default()
        };

        if entries.len() < max_files {
            debug!(entries = entries.len(), max_files, "Cache below retention limit");
            return Ok(report);
        }

        entries.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.path.cmp(&b.path)));
        let excess = entries.len() - max_files;

        for entry in entries.into_iter().take(excess) {
            match fs::remove_file(&entry.path).await {
                Ok(()) => {
                    report.removed += 1;
                    debug!(file = ?entry.path, "Evicted cache entry");
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    report.removed += 1;
                }
                Err(e) => {
                    error!(file = ?entry.path, error = %e, "Failed to remove old cache file");
                    report.failed.push((entry.path, e.to_string()));
                }
            }
        }

        if report.removed > 0 {
            info!(
                removed = report.removed,
                failed = report.failed.len(),
                max_files,
                "Trimmed cache"
            );
        }

        Ok(report)
    }

    /// Current cache statistics
    pub async fn stats(&self) -> Result<CacheStats> {
        let entries = self.list_entries().await?;
        let mut stats = CacheStats {
            entries: entries.len(),
            ..CacheStats::default()
        };

        for entry in &entries {
            stats.total_size += entry.len;
            let modified: DateTime<Utc> = entry.modified.into();
            stats.oldest = Some(stats.oldest.map_or(modified, |o| o.min(modified)));
            stats.newest = Some(stats.newest.map_or(modified, |n| n.max(modified)));
        }

        Ok(stats)
    }

    /// Regular files directly under the cache directory
    async fn list_files(&self) -> Result<Vec<PathBuf>> {
        let mut dir = fs::read_dir(&self.cache_dir)
            .await
            .map_err(|e| CacheError::storage(StorageStage::List, &self.cache_dir, e))?;

        let mut files = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| CacheError::storage(StorageStage::List, &self.cache_dir, e))?
        {
            match entry.file_type().await {
                Ok(file_type) if file_type.is_file() => files.push(entry.path()),
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(CacheError::storage(StorageStage::List, entry.path(), e)),
            }
        }
        Ok(files)
    }

    async fn list_entries(&self) -> Result<Vec<ListedEntry>> {
        let mut entries = Vec::new();
        for path in self.list_files().await? {
            let metadata = match fs::metadata(&path).await {
                Ok(metadata) => metadata,
                // Removed since listing
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(CacheError::storage(StorageStage::List, &path, e)),
            };
            entries.push(ListedEntry {
                modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                len: metadata.len(),
                path,
            });
        }
        Ok(entries)
    }
}

/// Persist the directory entry created by a rename
#[cfg(unix)]
async fn sync_dir(dir: &Path) -> Result<()> {
    let handle = fs::File::open(dir)
        .await
        .map_err(|e| CacheError::storage(StorageStage::Sync, dir, e))?;
    handle
        .sync_all()
        .await
        .map_err(|e| CacheError::storage(StorageStage::Sync, dir, e))
}

#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}

/// Create `path` exclusively, write `bytes` and fsync before returning
async fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|e| CacheError::storage(StorageStage::Create, path, e))?;

    file.write_all(bytes)
        .await
        .map_err(|e| CacheError::storage(StorageStage::Write, path, e))?;
    file.flush()
        .await
        .map_err(|e| CacheError::storage(StorageStage::Write, path, e))?;
    file.sync_all()
        .await
        .map_err(|e| CacheError::storage(StorageStage::Sync, path, e))?;
    Ok(())
}
