//! Base64url segment decoding for signed envelopes.
//!
//! Establishes no trust. Decoded bytes are only as good as the signature
//! checks that follow.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::de::DeserializeOwned;

use super::errors::VerificationError;

/// Decodes one base64url segment into raw bytes.
///
/// Trailing `=` padding is tolerated since some senders keep it.
pub fn decode_segment(segment: &str) -> Result<Vec<u8>, VerificationError> {
    URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|e| VerificationError::decode(format!("invalid base64url segment: {}", e)))
}

/// Decodes a base64url segment and parses it as JSON.
pub fn decode_json<T: DeserializeOwned>(segment: &str) -> Result<T, VerificationError> {
    let bytes = decode_segment(segment)?;
    serde_json::from_slice(&bytes)
        .map_err(|e| VerificationError::decode(format!("invalid JSON segment: {}", e)))
}

/// Decodes an `x5c` entry, which uses the standard alphabet with padding.
pub fn decode_certificate(entry: &str) -> Result<Vec<u8>, VerificationError> {
    STANDARD
        .decode(entry)
        .map_err(|e| VerificationError::decode(format!("invalid x5c entry: {}", e)))
}
