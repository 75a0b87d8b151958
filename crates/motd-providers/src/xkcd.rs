//! xkcd comic client

use crate::error::{ProviderError, Result};
use crate::traits::CaptionedProvider;
use crate::types::{Captioned, XkcdComic};
use async_trait::async_trait;
use rand::rngs::OsRng;
use rand::Rng;
use std::time::Duration;
use tracing::debug;

/// Client for the xkcd JSON interface
pub struct XkcdClient {
    http: reqwest::Client,
    base_url: String,
}

impl XkcdClient {
    pub const BASE_URL: &'static str = "https://xkcd.com";

    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            http,
            base_url: Self::BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Fetch one comic, or the latest one when `number` is `None`
    pub async fn comic(&self, number: Option<u32>) -> Result<XkcdComic> {
        let url = match number {
            Some(n) => format!("{}/{}/info.0.json", self.base_url, n),
            None => format!("{}/info.0.json", self.base_url),
        };

        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ProviderError::Status {
                url,
                status: response.status().as_u16(),
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl Default for XkcdClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptionedProvider for XkcdClient {
    fn name(&self) -> &'static str {
        "xkcd"
    }

    async fn random(&self) -> Result<Captioned> {
        let latest = self.comic(None).await?;
        if latest.num == 0 {
            return Err(ProviderError::MissingField("num"));
        }

        let number = OsRng.gen_range(1..=latest.num);
        let comic = self.comic(Some(number)).await?;
        debug!(number = comic.num, title = %comic.title, "Fetched xkcd comic");

        comic.into_captioned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn respond_json(server: &MockServer, at: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_random_picks_existing_comic() {
        let server = MockServer::start().await;
        let base = server.uri();
        respond_json(
            &server,
            "/info.0.json",
            serde_json::json!({"num": 3, "img": "ignored", "alt": "latest"}),
        )
        .await;
        for n in 1..=3 {
            respond_json(
                &server,
                &format!("/{}/info.0.json", n),
                serde_json::json!({
                    "num": n,
                    "title": format!("Comic {}", n),
                    "img": format!("{}/{}.png", base, n),
                    "alt": format!("alt {}", n)
                }),
            )
            .await;
        }

        let client = XkcdClient::new().with_base_url(&base);
        for _ in 0..10 {
            let captioned = client.random().await.unwrap();
            let n: u32 = captioned
                .url
                .trim_start_matches(&format!("{}/", base))
                .trim_end_matches(".png")
                .parse()
                .unwrap();
            assert!((1..=3).contains(&n));
            assert_eq!(captioned.caption, Some(format!("alt {}", n)));
        }
    }

    #[tokio::test]
    async fn test_latest_comic_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = XkcdClient::new().with_base_url(server.uri());
        let err = client.random().await.unwrap_err();
        assert!(matches!(err, ProviderError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_malformed_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .mount(&server)
            .await;

        let client = XkcdClient::new().with_base_url(server.uri());
        assert!(matches!(client.comic(None).await, Err(ProviderError::Json(_))));
    }

    #[tokio::test]
    async fn test_zero_latest_number() {
        let server = MockServer::start().await;
        respond_json(&server, "/info.0.json", serde_json::json!({"num": 0})).await;

        let client = XkcdClient::new().with_base_url(server.uri());
        assert!(matches!(
            client.random().await,
            Err(ProviderError::MissingField("num"))
        ));
    }
}
