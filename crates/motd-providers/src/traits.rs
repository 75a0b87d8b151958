//! Provider traits the ingestion worker is written against

use crate::error::Result;
use crate::types::Captioned;
use async_trait::async_trait;

/// A provider that picks content matching a tag and a content rating
#[async_trait]
pub trait TaggedProvider: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    async fn random(&self, tag: &str, rating: &str) -> Result<String>;
}

/// A provider that picks content on its own and may attach a caption
#[async_trait]
pub trait CaptionedProvider: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    async fn random(&self) -> Result<Captioned>;
}
