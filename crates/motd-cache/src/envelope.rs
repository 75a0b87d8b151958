//! Inline-image envelope format
//!
//! Each cache file holds the body of an iTerm2-style inline image escape:
//!
//! ```text
//! 1337;File=inline=1;size=<N>;name=<base64(url)>:<base64(payload)>[<caption>\n]
//! ```
//!
//! Terminal clients wrap the body in `ESC ] ... BEL` themselves, so the file
//! content is written verbatim to the socket.

use crate::error::{CacheError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Escape code identifier that opens every envelope
pub const ENVELOPE_PREFIX: &str = "1337";

const HEADER: &str = "1337;File=inline=1;size=";

/// Render the envelope for a payload.
///
/// An empty caption is treated the same as no caption.
pub fn encode(identity: &str, payload: &[u8], caption: Option<&str>) -> String {
    let encoded = STANDARD.encode(payload);
    let mut out = format!(
        "{};File=inline=1;size={};name={}:{}",
        ENVELOPE_PREFIX,
        payload.len(),
        identity,
        encoded
    );
    if let Some(caption) = caption.filter(|c| !c.is_empty()) {
        out.push_str(caption);
        out.push('\n');
    }
    out
}

/// A decoded envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub size: usize,
    pub identity: String,
    pub payload: Vec<u8>,
    pub caption: Option<String>,
}

impl Envelope {
    /// Parse the raw bytes of a cache file.
    ///
    /// The length of the payload segment follows from `size`, so a caption
    /// that starts with base64 characters is still split off correctly.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(data)
            .map_err(|e| CacheError::Encoding(format!("envelope is not UTF-8: {}", e)))?;

        let rest = text
            .strip_prefix(HEADER)
            .ok_or_else(|| CacheError::Encoding("missing envelope header".to_string()))?;

        let (size, rest) = rest
            .split_once(";name=")
            .ok_or_else(|| CacheError::Encoding("missing name field".to_string()))?;
        let size: usize = size
            .parse()
            .map_err(|e| CacheError::Encoding(format!("invalid size {:?}: {}", size, e)))?;

        let (identity, rest) = rest
            .split_once(':')
            .ok_or_else(|| CacheError::Encoding("missing payload separator".to_string()))?;

        let encoded_len = size
            .div_ceil(3)
            .checked_mul(4)
            .ok_or_else(|| CacheError::Encoding(format!("size {} too large", size)))?;
        let encoded = rest
            .get(..encoded_len)
            .ok_or_else(|| CacheError::Encoding("payload shorter than declared size".to_string()))?;
        let payload = STANDARD
            .decode(encoded)
            .map_err(|e| CacheError::Encoding(format!("invalid payload: {}", e)))?;
        if payload.len() != size {
            return Err(CacheError::Encoding(format!(
                "payload decodes to {} bytes, header says {}",
                payload.len(),
                size
            )));
        }

        let tail = &rest[encoded_len..];
        let caption = if tail.is_empty() {
            None
        } else {
            let caption = tail
                .strip_suffix('\n')
                .ok_or_else(|| CacheError::Encoding("caption is not newline terminated".to_string()))?;
            Some(caption.to_string())
        };

        Ok(Self {
            size,
            identity: identity.to_string(),
            payload,
            caption,
        })
    }
}
