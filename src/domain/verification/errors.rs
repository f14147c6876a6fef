//! Verification error types for inbound App Store notifications.
//!
//! Every variant is a rejection of the payload itself. None of them are
//! retryable: the same bytes will fail the same way on redelivery.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors raised while authenticating a signed notification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// Malformed base64, JSON, certificate DER, or missing envelope parts.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The trusted root did not issue the last certificate in the chain.
    #[error("Certificate chain is not rooted in the trusted root")]
    ChainNotRooted,

    /// A certificate in the chain is not signed by its successor.
    #[error("Certificate chain signature is invalid")]
    ChainSignature,

    /// The declared algorithm is not on the allow-list.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// A signed token failed signature verification.
    #[error("Invalid signature")]
    SignatureInvalid,

    /// The leaf certificate carries a key the verifier cannot use.
    #[error("Unsupported key: {0}")]
    UnsupportedKey(String),
}

impl VerificationError {
    pub fn decode(reason: impl Into<String>) -> Self {
        VerificationError::Decode(reason.into())
    }

    /// Verification failures are never retried by the sender.
    pub fn is_retryable(&self) -> bool {
        false
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::FORBIDDEN
    }
}
