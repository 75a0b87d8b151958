//! Data types for provider API responses
//!
//! Only the fields the cache needs are decoded. Everything is optional on the
//! wire and checked once, so a malformed response turns into a single
//! `ProviderError::MissingField`.

use crate::error::{ProviderError, Result};
use serde::Deserialize;

/// A content URL with an optional caption to print after the image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captioned {
    pub url: String,
    pub caption: Option<String>,
}

/// Response from Giphy `/v1/gifs/random`
#[derive(Debug, Deserialize)]
pub struct GiphyRandomResponse {
    #[serde(default)]
    pub data: GiphyData,
}

/// Giphy sends an empty array instead of an object when nothing matched
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum GiphyData {
    Gif(GiphyGif),
    Empty(Vec<serde_json::Value>),
}

impl Default for GiphyData {
    fn default() -> Self {
        GiphyData::Empty(Vec::new())
    }
}

#[derive(Debug, Deserialize)]
pub struct GiphyGif {
    pub id: Option<String>,
    pub images: Option<GiphyImages>,
}

#[derive(Debug, Deserialize)]
pub struct GiphyImages {
    pub original: Option<GiphyImage>,
    pub downsized_large: Option<GiphyImage>,
}

#[derive(Debug, Deserialize)]
pub struct GiphyImage {
    pub url: Option<String>,
}

impl GiphyGif {
    /// The original and downsized URLs, both of which must be present
    pub fn urls(&self) -> Result<(&str, &str)> {
        let images = self
            .images
            .as_ref()
            .ok_or(ProviderError::MissingField("data.images"))?;
        let original = non_empty(images.original.as_ref().and_then(|i| i.url.as_deref()))
            .ok_or(ProviderError::MissingField("data.images.original.url"))?;
        let downsized = non_empty(images.downsized_large.as_ref().and_then(|i| i.url.as_deref()))
            .ok_or(ProviderError::MissingField("data.images.downsized_large.url"))?;
        Ok((original, downsized))
    }
}

/// Comic metadata from `https://xkcd.com/[n/]info.0.json`
#[derive(Debug, Clone, Deserialize)]
pub struct XkcdComic {
    pub num: u32,
    #[serde(default)]
    pub title: String,
    pub img: Option<String>,
    #[serde(default)]
    pub alt: String,
}

impl XkcdComic {
    pub fn into_captioned(self) -> Result<Captioned> {
        let url = self
            .img
            .filter(|u| !u.is_empty())
            .ok_or(ProviderError::MissingField("img"))?;
        Ok(Captioned {
            url,
            caption: Some(self.alt).filter(|a| !a.is_empty()),
        })
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_giphy_random_deserialization() {
        let json = r#"{
            "data": {
                "type": "gif",
                "id": "abc123",
                "images": {
                    "original": {"url": "https://media.giphy.com/original.gif", "size": "9000000"},
                    "downsized_large": {"url": "https://media.giphy.com/downsized.gif"}
                }
            },
            "meta": {"status": 200, "msg": "OK"}
        }"#;

        let response: GiphyRandomResponse = serde_json::from_str(json).unwrap();
        let GiphyData::Gif(gif) = response.data else {
            panic!("expected a gif");
        };
        assert_eq!(gif.id.as_deref(), Some("abc123"));
        let (original, downsized) = gif.urls().unwrap();
        assert_eq!(original, "https://media.giphy.com/original.gif");
        assert_eq!(downsized, "https://media.giphy.com/downsized.gif");
    }

    #[test]
    fn test_giphy_empty_result() {
        let json = r#"{"data": [], "meta": {"status": 200, "msg": "OK"}}"#;
        let response: GiphyRandomResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(response.data, GiphyData::Empty(_)));

        let response: GiphyRandomResponse = serde_json::from_str(r#"{"meta": {}}"#).unwrap();
        assert!(matches!(response.data, GiphyData::Empty(_)));
    }

    #[test]
    fn test_giphy_missing_downsized() {
        let json = r#"{"data": {"images": {"original": {"url": "https://a/b.gif"}}}}"#;
        let response: GiphyRandomResponse = serde_json::from_str(json).unwrap();
        let GiphyData::Gif(gif) = response.data else {
            panic!("expected a gif");
        };
        let err = gif.urls().unwrap_err();
        assert!(matches!(
            err,
            ProviderError::MissingField("data.images.downsized_large.url")
        ));
    }

    #[test]
    fn test_giphy_empty_url_is_missing() {
        let json = r#"{"data": {"images": {"original": {"url": ""}, "downsized_large": {"url": "x"}}}}"#;
        let response: GiphyRandomResponse = serde_json::from_str(json).unwrap();
        let GiphyData::Gif(gif) = response.data else {
            panic!("expected a gif");
        };
        assert!(gif.urls().is_err());
    }

    #[test]
    fn test_xkcd_comic_deserialization() {
        let json = r#"{
            "month": "7", "num": 353, "link": "", "year": "2007",
            "news": "", "safe_title": "Python",
            "transcript": "", "alt": "I wrote 20 short programs in Python yesterday.",
            "img": "https://imgs.xkcd.com/comics/python.png",
            "title": "Python", "day": "7"
        }"#;

        let comic: XkcdComic = serde_json::from_str(json).unwrap();
        assert_eq!(comic.num, 353);
        assert_eq!(comic.title, "Python");

        let captioned = comic.into_captioned().unwrap();
        assert_eq!(captioned.url, "https://imgs.xkcd.com/comics/python.png");
        assert_eq!(
            captioned.caption.as_deref(),
            Some("I wrote 20 short programs in Python yesterday.")
        );
    }

    #[test]
    fn test_xkcd_comic_without_image() {
        let comic: XkcdComic = serde_json::from_str(r#"{"num": 404}"#).unwrap();
        assert!(matches!(
            comic.into_captioned(),
            Err(ProviderError::MissingField("img"))
        ));
    }

    #[test]
    fn test_xkcd_empty_alt_has_no_caption() {
        let comic: XkcdComic =
            serde_json::from_str(r#"{"num": 1, "img": "https://imgs.xkcd.com/1.png", "alt": ""}"#)
                .unwrap();
        assert!(comic.into_captioned().unwrap().caption.is_none());
    }
}
