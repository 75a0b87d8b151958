//! Error types for the motd cache store

use std::fmt;
use std::io;
use std::path::PathBuf;

/// The filesystem step that failed while touching the cache directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageStage {
    CreateDir,
    Create,
    Write,
    Sync,
    Publish,
    List,
    Read,
    Remove,
}

impl fmt::Display for StorageStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageStage::CreateDir => "create directory",
            StorageStage::Create => "create file",
            StorageStage::Write => "write file",
            StorageStage::Sync => "sync file",
            StorageStage::Publish => "publish file",
            StorageStage::List => "list directory",
            StorageStage::Read => "read file",
            StorageStage::Remove => "remove file",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub enum CacheError {
    /// The source URL is not a fetchable http(s) URL
    InvalidUrl(String),
    /// Reaching or reading from the content URL failed
    Download(Box<reqwest::Error>),
    /// A stored envelope could not be decoded
    Encoding(String),
    Storage {
        stage: StorageStage,
        path: PathBuf,
        source: Box<io::Error>,
    },
    EmptyCache,
}

impl CacheError {
    pub(crate) fn storage(stage: StorageStage, path: impl Into<PathBuf>, source: io::Error) -> Self {
        CacheError::Storage {
            stage,
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// True when the entry picked for reading was deleted before it could be read.
    ///
    /// This happens when a retention pass races a random read and is safe to retry.
    pub fn is_vanished(&self) -> bool {
        matches!(
            self,
            CacheError::Storage { stage: StorageStage::Read, source, .. }
                if source.kind() == io::ErrorKind::NotFound
        )
    }
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::InvalidUrl(msg) => write!(f, "Invalid URL: {}", msg),
            CacheError::Download(err) => write!(f, "Download error: {}", err),
            CacheError::Encoding(msg) => write!(f, "Encoding error: {}", msg),
            CacheError::Storage {
                stage,
                path,
                source,
            } => write!(f, "Storage error ({}) at {:?}: {}", stage, path, source),
            CacheError::EmptyCache => write!(f, "No cached files found"),
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::Download(err) => Some(err.as_ref()),
            CacheError::Storage { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for CacheError {
    fn from(err: reqwest::Error) -> Self {
        CacheError::Download(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
