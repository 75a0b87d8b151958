//! Configuration parsed from `MOTD_*` environment variables

use crate::error::{Result, ServerError};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Rating used for a tag listed without one
pub const DEFAULT_RATING: &str = "g";

/// One Giphy query made on every ingestion tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagQuery {
    pub tag: String,
    pub rating: String,
}

impl TagQuery {
    pub fn new(tag: impl Into<String>, rating: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            rating: rating.into(),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct MotdConfig {
    pub cache_dir: PathBuf,
    /// Retention ceiling, at least 1
    pub cache_max_files: usize,
    /// Largest Giphy original to download before using the downsized rendition
    pub max_file_size: u64,
    pub giphy_api_key_file: PathBuf,
    pub giphy_tags: Vec<TagQuery>,
    pub xkcd_enabled: bool,
    pub download_interval: Duration,
    pub cleanup_interval: Duration,
    pub listen_host: String,
    pub listen_port: u16,
}

impl Default for MotdConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(".motd"),
            cache_max_files: 50,
            max_file_size: 10 * 1024 * 1024, // 10MB
            giphy_api_key_file: PathBuf::from(".giphy-api"),
            giphy_tags: Vec::new(),
            xkcd_enabled: true,
            download_interval: Duration::from_secs(10),
            cleanup_interval: Duration::from_secs(60),
            listen_host: "localhost".to_string(),
            listen_port: 4200,
        }
    }
}

impl MotdConfig {
    /// Parse configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Parse configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let home = PathBuf::from(lookup("HOME").unwrap_or_else(|| ".".to_string()));

        let cache_dir = lookup("MOTD_CACHE_DIR")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join(".motd"));

        let giphy_api_key_file = lookup("MOTD_GIPHY_API_KEY_FILE")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join(".giphy-api"));

        let cache_max_files =
            parse_var(&lookup, "MOTD_CACHE_MAX_FILES", defaults.cache_max_files)?;
        if cache_max_files == 0 {
            return Err(ServerError::Config(
                "MOTD_CACHE_MAX_FILES must be at least 1".to_string(),
            ));
        }

        let max_file_size = parse_var(&lookup, "MOTD_MAX_FILE_SIZE", defaults.max_file_size)?;

        let giphy_tags = match lookup("MOTD_GIPHY_TAGS") {
            Some(raw) => parse_tags(&raw)?,
            None => Vec::new(),
        };

        let xkcd_enabled = match lookup("MOTD_XKCD_ENABLED") {
            Some(raw) => parse_bool("MOTD_XKCD_ENABLED", &raw)?,
            None => defaults.xkcd_enabled,
        };

        let download_interval = parse_interval(&lookup, "MOTD_DOWNLOAD_INTERVAL", defaults.download_interval)?;
        let cleanup_interval = parse_interval(&lookup, "MOTD_CLEANUP_INTERVAL", defaults.cleanup_interval)?;

        let listen_host = lookup("MOTD_LISTEN_HOST")
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.listen_host);
        let listen_port = parse_var(&lookup, "MOTD_LISTEN_PORT", defaults.listen_port)?;

        Ok(Self {
            cache_dir,
            cache_max_files,
            max_file_size,
            giphy_api_key_file,
            giphy_tags,
            xkcd_enabled,
            download_interval,
            cleanup_interval,
            listen_host,
            listen_port,
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| ServerError::Config(format!("invalid {}={:?}: {}", key, raw, e))),
        _ => Ok(default),
    }
}

/// Whole seconds, at least 1
fn parse_interval<F>(lookup: &F, key: &str, default: Duration) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let secs: u64 = parse_var(lookup, key, default.as_secs())?;
    if secs == 0 {
        return Err(ServerError::Config(format!("{} must be at least 1 second", key)));
    }
    Ok(Duration::from_secs(secs))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ServerError::Config(format!("invalid {}={:?}: expected a boolean", key, raw))),
    }
}

/// Parse `tag:rating,tag:rating`. A tag without a rating gets [`DEFAULT_RATING`].
pub fn parse_tags(raw: &str) -> Result<Vec<TagQuery>> {
    let mut tags = Vec::new();
    for item in raw.split(',') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        let (tag, rating) = match item.split_once(':') {
            Some((tag, rating)) => (tag.trim(), rating.trim()),
            None => (item, DEFAULT_RATING),
        };
        if tag.is_empty() {
            return Err(ServerError::Config(format!("empty Giphy tag in {:?}", raw)));
        }
        let rating = if rating.is_empty() { DEFAULT_RATING } else { rating };
        tags.push(TagQuery::new(tag, rating));
    }
    Ok(tags)
}
