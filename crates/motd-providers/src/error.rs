//! Error types for content providers

use std::fmt;

/// Errors that can occur while asking a provider for content
#[derive(Debug)]
pub enum ProviderError {
    /// HTTP request failed
    Http(Box<reqwest::Error>),
    /// Failed to parse JSON response
    Json(serde_json::Error),
    /// Provider answered with a non-success status
    Status { url: String, status: u16 },
    /// A required field was missing or malformed in the response
    MissingField(&'static str),
    /// The query matched nothing
    NoResults(String),
    /// Provider could not be set up (e.g. unreadable API key file)
    Config(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "Provider HTTP error: {}", e),
            Self::Json(e) => write!(f, "Provider JSON parse error: {}", e),
            Self::Status { url, status } => write!(f, "{} returned status {}", url, status),
            Self::MissingField(field) => write!(f, "Missing or malformed field: {}", field),
            Self::NoResults(query) => write!(f, "No results for {}", query),
            Self::Config(msg) => write!(f, "Provider configuration error: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Http(e) => Some(e.as_ref()),
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(Box::new(e))
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

/// Result type for provider operations
pub type Result<T> = std::result::Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_display() {
        let err = ProviderError::MissingField("data.images.original.url");
        assert_eq!(
            format!("{}", err),
            "Missing or malformed field: data.images.original.url"
        );
    }

    #[test]
    fn test_status_display() {
        let err = ProviderError::Status {
            url: "https://xkcd.com/info.0.json".to_string(),
            status: 503,
        };
        assert_eq!(
            format!("{}", err),
            "https://xkcd.com/info.0.json returned status 503"
        );
    }

    #[test]
    fn test_json_error_has_source() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ProviderError::from(json_err);
        assert!(std::error::Error::source(&err).is_some());
    }
}
