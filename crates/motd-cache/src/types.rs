//! Cache types

use crate::envelope;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Longest URL-derived segment kept in a file name
const MAX_NAME_IDENTITY: usize = 200;

/// One unit of cached content, before it is written to disk
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Standard base64 of the source URL
    pub identity: String,
    /// URL-safe identity used in the file name (no path separators)
    pub name_identity: String,
    pub created_at: DateTime<Utc>,
    pub payload: Vec<u8>,
    pub caption: Option<String>,
}

impl CacheEntry {
    pub fn new(url: &str, payload: Vec<u8>, caption: Option<&str>, created_at: DateTime<Utc>) -> Self {
        let mut name_identity = URL_SAFE_NO_PAD.encode(url.as_bytes());
        name_identity.truncate(MAX_NAME_IDENTITY);

        Self {
            identity: STANDARD.encode(url.as_bytes()),
            name_identity,
            created_at,
            payload,
            caption: caption.filter(|c| !c.is_empty()).map(str::to_string),
        }
    }

    /// File name under the cache directory: `<unix nanos>_<identity>`
    pub fn file_name(&self) -> String {
        let nanos = self
            .created_at
            .timestamp_nanos_opt()
            .unwrap_or_else(|| self.created_at.timestamp_micros().saturating_mul(1000));
        format!("{}_{}", nanos, self.name_identity)
    }

    /// The exact bytes stored on disk
    pub fn envelope(&self) -> String {
        envelope::encode(&self.identity, &self.payload, self.caption.as_deref())
    }
}

/// Summary of the cache directory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub total_size: u64,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}

/// Outcome of one retention pass
#[derive(Debug, Default)]
pub struct TrimReport {
    /// Entries present before the pass
    pub scanned: usize,
    pub removed: usize,
    /// Entries whose deletion failed, with the error message
    pub failed: Vec<(PathBuf, String)>,
}

impl TrimReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}
