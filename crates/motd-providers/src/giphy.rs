//! Giphy random-GIF client

use crate::error::{ProviderError, Result};
use crate::traits::TaggedProvider;
use crate::types::{GiphyData, GiphyRandomResponse};
use async_trait::async_trait;
use reqwest::header::CONTENT_LENGTH;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Client for the Giphy random endpoint
///
/// Giphy's originals can be tens of megabytes, so the client checks the
/// original's size with a `HEAD` request and falls back to the
/// `downsized_large` rendition when it exceeds `max_file_size`.
pub struct GiphyClient {
    http: reqwest::Client,
    api_key: String,
    max_file_size: u64,
    base_url: String,
}

impl GiphyClient {
    /// Base URL for the Giphy API
    pub const BASE_URL: &'static str = "https://api.giphy.com";

    /// Create a client with a 30 second request timeout
    pub fn new(api_key: impl Into<String>, max_file_size: u64) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            http,
            api_key: api_key.into(),
            max_file_size,
            base_url: Self::BASE_URL.to_string(),
        }
    }

    /// Create a client with the API key read from `path`
    pub fn from_key_file(path: &Path, max_file_size: u64) -> Result<Self> {
        let key = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::Config(format!("failed to read Giphy API key file {:?}: {}", path, e))
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(ProviderError::Config(format!(
                "Giphy API key file {:?} is empty",
                path
            )));
        }
        Ok(Self::new(key, max_file_size))
    }

    /// Point the client at a different API host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Pick the rendition to download given the original's size
    pub fn choose_url<'a>(original: &'a str, downsized: &'a str, size: u64, max_file_size: u64) -> &'a str {
        if size > max_file_size {
            downsized
        } else {
            original
        }
    }

    async fn random_gif(&self, tag: &str, rating: &str) -> Result<(String, String)> {
        let url = format!(
            "{}/v1/gifs/random?api_key={}&tag={}&rating={}",
            self.base_url,
            urlencoding::encode(&self.api_key),
            urlencoding::encode(tag),
            urlencoding::encode(rating)
        );

        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ProviderError::Status {
                url: format!("{}/v1/gifs/random", self.base_url),
                status: response.status().as_u16(),
            });
        }

        let body = response.text().await?;
        let parsed: GiphyRandomResponse = serde_json::from_str(&body)?;
        match parsed.data {
            GiphyData::Gif(gif) => {
                let (original, downsized) = gif.urls()?;
                Ok((original.to_string(), downsized.to_string()))
            }
            GiphyData::Empty(_) => Err(ProviderError::NoResults(format!(
                "tag {:?} rating {:?}",
                tag, rating
            ))),
        }
    }

    async fn content_length(&self, url: &str) -> Result<u64> {
        let response = self.http.head(url).send().await?;
        if !response.status().is_success() {
            return Err(ProviderError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .ok_or(ProviderError::MissingField("Content-Length"))
    }
}

#[async_trait]
impl TaggedProvider for GiphyClient {
    fn name(&self) -> &'static str {
        "giphy"
    }

    async fn random(&self, tag: &str, rating: &str) -> Result<String> {
        let (original, downsized) = self.random_gif(tag, rating).await?;
        let size = self.content_length(&original).await?;
        let chosen = Self::choose_url(&original, &downsized, size, self.max_file_size);

        debug!(tag, rating, size, url = chosen, "Picked Giphy GIF");
        Ok(chosen.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gif_json(base: &str) -> serde_json::Value {
        serde_json::json!({
            "data": {
                "id": "x",
                "images": {
                    "original": {"url": format!("{}/original.gif", base)},
                    "downsized_large": {"url": format!("{}/downsized.gif", base)}
                }
            }
        })
    }

    /// Serve a random-GIF answer plus a `HEAD` for the original advertising `size` bytes
    async fn giphy_server(size: usize) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/gifs/random"))
            .respond_with(ResponseTemplate::new(200).set_body_json(gif_json(&server.uri())))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/original.gif"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; size]))
            .mount(&server)
            .await;
        server
    }

    #[test]
    fn test_choose_url() {
        assert_eq!(GiphyClient::choose_url("o", "d", 10, 10), "o");
        assert_eq!(GiphyClient::choose_url("o", "d", 11, 10), "d");
        assert_eq!(GiphyClient::choose_url("o", "d", 0, 0), "o");
    }

    #[test]
    fn test_from_key_file_trims_whitespace() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".giphy-api");
        std::fs::write(&path, "secret-key\n").unwrap();

        let client = GiphyClient::from_key_file(&path, 1024).unwrap();
        assert_eq!(client.api_key, "secret-key");
    }

    #[test]
    fn test_from_key_file_missing_or_empty() {
        let dir = tempdir().unwrap();
        let missing = GiphyClient::from_key_file(&dir.path().join("nope"), 1024);
        assert!(matches!(missing, Err(ProviderError::Config(_))));

        let path = dir.path().join("empty");
        std::fs::write(&path, "  \n").unwrap();
        assert!(matches!(
            GiphyClient::from_key_file(&path, 1024),
            Err(ProviderError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_random_sends_query_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/gifs/random"))
            .and(query_param("api_key", "k"))
            .and(query_param("tag", "funny cats"))
            .and(query_param("rating", "pg-13"))
            .respond_with(ResponseTemplate::new(200).set_body_json(gif_json(&server.uri())))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/original.gif"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 10]))
            .mount(&server)
            .await;

        let client = GiphyClient::new("k", 1000).with_base_url(server.uri());
        let url = client.random("funny cats", "pg-13").await.unwrap();
        assert_eq!(url, format!("{}/original.gif", server.uri()));
    }

    #[tokio::test]
    async fn test_random_prefers_original_when_small() {
        let server = giphy_server(500).await;

        let client = GiphyClient::new("k", 1000).with_base_url(server.uri());
        let url = client.random("funny", "g").await.unwrap();
        assert_eq!(url, format!("{}/original.gif", server.uri()));
    }

    #[tokio::test]
    async fn test_random_falls_back_to_downsized() {
        let server = giphy_server(2000).await;

        let client = GiphyClient::new("k", 1000).with_base_url(server.uri());
        let url = client.random("funny", "pg").await.unwrap();
        assert_eq!(url, format!("{}/downsized.gif", server.uri()));
    }

    #[tokio::test]
    async fn test_random_no_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
            .mount(&server)
            .await;

        let client = GiphyClient::new("k", 1000).with_base_url(server.uri());
        let err = client.random("zzzz", "g").await.unwrap_err();
        assert!(matches!(err, ProviderError::NoResults(_)));
    }

    #[tokio::test]
    async fn test_random_api_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = GiphyClient::new("bad", 1000).with_base_url(server.uri());
        let err = client.random("funny", "g").await.unwrap_err();
        assert!(matches!(err, ProviderError::Status { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_random_head_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/gifs/random"))
            .respond_with(ResponseTemplate::new(200).set_body_json(gif_json(&server.uri())))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = GiphyClient::new("k", 1000).with_base_url(server.uri());
        let err = client.random("funny", "g").await.unwrap_err();
        assert!(matches!(err, ProviderError::Status { status: 500, .. }));
    }
}
