//! Bounded on-disk cache of inline-image envelopes
//!
//! Stores downloaded images and comics as self-contained envelope files,
//! hands out a uniformly random entry on request, and trims the directory
//! down to a maximum number of entries, oldest first.

mod cache;
pub mod envelope;
mod error;
mod types;

pub use cache::{CacheStore, STAGING_DIR};
pub use envelope::Envelope;
pub use error::{CacheError, Result, StorageStage};
pub use types::{CacheEntry, CacheStats, TrimReport};
