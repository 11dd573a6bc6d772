//! Informational decode of three-segment bearer tokens.
//!
//! No signature is verified here; the backend remains the only trust boundary.
//! Every failure collapses to `None` at the public surface.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::claims::Claims;

/// Standard alphabet, canonical padding, tolerant of non-zero trailing bits like `atob`.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::RequireCanonical),
);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is empty")]
    Empty,
    #[error("expected 3 dot-separated segments, found {0}")]
    SegmentCount(usize),
    #[error("payload is not valid base64: {0}")]
    Base64(String),
    #[error("payload is not valid JSON: {0}")]
    Json(String),
    #[error("payload is not a JSON object")]
    NotObject,
}

/// Translate a base64url segment to the standard alphabet and pad it to a multiple of 4.
fn to_standard_base64(segment: &str) -> String {
    let mut out: String = segment
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    while out.len() % 4 != 0 {
        out.push('=');
    }
    out
}

pub fn decode_claims(token: &str) -> Result<Claims, TokenError> {
    if token.is_empty() {
        return Err(TokenError::Empty);
    }
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(TokenError::SegmentCount(segments.len()));
    }
    let payload = to_standard_base64(segments[1]);
    let bytes = PAYLOAD_ENGINE
        .decode(payload.as_bytes())
        .map_err(|e| TokenError::Base64(e.to_string()))?;
    match serde_json::from_slice::<Value>(&bytes).map_err(|e| TokenError::Json(e.to_string()))? {
        Value::Object(map) => Ok(Claims::from_map(map)),
        _ => Err(TokenError::NotObject),
    }
}

/// Decode the payload segment of `token` into claims, or `None` on any failure.
pub fn decode(token: &str) -> Option<Claims> {
    match decode_claims(token) {
        Ok(claims) => Some(claims),
        Err(e) => {
            debug!(target: "session.token", token_len = token.len(), "token not decodable: {}", e);
            None
        }
    }
}

/// Build an unsigned `header.payload.signature` token around `payload`.
/// Intended for fixtures and offline tooling; the signature segment is a placeholder.
pub fn compose_unsigned(payload: &Value) -> String {
    let header = serde_json::json!({"alg": "none", "typ": "JWT"});
    let b64 = base64::engine::general_purpose::URL_SAFE_NO_PAD;
    format!(
        "{}.{}.unsigned",
        b64.encode(header.to_string()),
        b64.encode(payload.to_string())
    )
}
