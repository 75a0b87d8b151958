//! Content providers for the motd cache
//!
//! Each provider answers one question: "give me the URL of something worth
//! showing". The cache downloads and stores whatever URL comes back.
//!
//! - [`GiphyClient`] picks a random GIF for a tag and rating
//! - [`XkcdClient`] picks a random comic and returns its alt text as caption
//!
//! The ingestion worker is written against the [`TaggedProvider`] and
//! [`CaptionedProvider`] traits so tests can substitute their own.

mod error;
mod giphy;
mod traits;
mod types;
mod xkcd;

pub use error::{ProviderError, Result};
pub use giphy::GiphyClient;
pub use traits::{CaptionedProvider, TaggedProvider};
pub use types::{Captioned, GiphyData, GiphyGif, GiphyRandomResponse, XkcdComic};
pub use xkcd::XkcdClient;
