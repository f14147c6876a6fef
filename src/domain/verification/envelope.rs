//! Signed notification envelope.
//!
//! `signedPayload` is a compact JWS: `header.claims.signature`. The header
//! names the algorithm and carries the `x5c` chain; the claims carry the
//! notification type and two further signed tokens.

use serde::Deserialize;

use crate::domain::subscription::{NotificationSubtype, NotificationType};

use super::certificate_chain::Certificate;
use super::errors::VerificationError;
use super::payload_codec::decode_json;

/// Envelope header fields the verifier consumes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EnvelopeHeader {
    pub alg: String,
    #[serde(default)]
    pub x5c: Vec<String>,
}

/// Signed tokens nested in the envelope claims.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    pub signed_transaction_info: String,
    #[serde(default)]
    pub signed_renewal_info: Option<String>,
}

/// Outer claims of the envelope.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationClaims {
    pub notification_type: NotificationType,
    #[serde(default)]
    pub subtype: Option<NotificationSubtype>,
    #[serde(rename = "notificationUUID")]
    pub notification_uuid: String,
    #[serde(default)]
    pub data: Option<NotificationData>,
}

/// A parsed but not yet trusted envelope.
#[derive(Debug, Clone)]
pub struct SignedEnvelope {
    raw: String,
    pub header: EnvelopeHeader,
    pub claims: NotificationClaims,
}

impl SignedEnvelope {
    pub fn parse(signed_payload: &str) -> Result<Self, VerificationError> {
        let mut segments = signed_payload.split('.');
        let header_segment = segments.next().unwrap_or_default();
        let claims_segment = segments.next().unwrap_or_default();
        if header_segment.is_empty() || claims_segment.is_empty() {
            return Err(VerificationError::decode(
                "signed payload must contain header and claims segments",
            ));
        }

        Ok(Self {
            raw: signed_payload.to_string(),
            header: decode_json(header_segment)?,
            claims: decode_json(claims_segment)?,
        })
    }

    /// Certificates from the `x5c` header, leaf first.
    pub fn certificates(&self) -> Result<Vec<Certificate>, VerificationError> {
        self.header
            .x5c
            .iter()
            .map(|entry| Certificate::from_base64(entry))
            .collect()
    }

    /// The nested token payload, which every processed notification needs.
    pub fn data(&self) -> Result<&NotificationData, VerificationError> {
        self.claims
            .data
            .as_ref()
            .ok_or_else(|| VerificationError::decode("notification claims carry no data"))
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}
