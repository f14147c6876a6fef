//! Signature verification of the tokens nested in a notification.
//!
//! The algorithm comes from the envelope header but is only honoured when it
//! is on the configured allow-list. An algorithm outside the list is refused
//! before any key is built or signature checked.

use std::str::FromStr;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::de::DeserializeOwned;

use crate::domain::foundation::NotificationUuid;
use crate::domain::subscription::{RenewalInfo, TransactionInfo, VerifiedNotification};

use super::certificate_chain::LeafPublicKey;
use super::envelope::SignedEnvelope;
use super::errors::VerificationError;

/// Verifies signed tokens with a leaf key from a trusted chain.
#[derive(Debug, Clone)]
pub struct ClaimVerifier {
    allowed_algorithms: Vec<Algorithm>,
    verify_envelope: bool,
}

impl ClaimVerifier {
    /// `verify_envelope` additionally checks the outer envelope signature,
    /// which authenticates the notification type and UUID.
    pub fn new(allowed_algorithms: Vec<Algorithm>, verify_envelope: bool) -> Self {
        Self {
            allowed_algorithms,
            verify_envelope,
        }
    }

    /// Resolves a header `alg` against the allow-list.
    pub fn resolve_algorithm(&self, declared: &str) -> Result<Algorithm, VerificationError> {
        Algorithm::from_str(declared)
            .ok()
            .filter(|algorithm| self.allowed_algorithms.contains(algorithm))
            .ok_or_else(|| {
                tracing::warn!(algorithm = %declared, "Rejected algorithm not on allow-list");
                VerificationError::UnsupportedAlgorithm(declared.to_string())
            })
    }

    /// Verifies the nested tokens of `envelope` and merges them with its
    /// outer claims.
    pub fn verify(
        &self,
        leaf: &LeafPublicKey,
        algorithm: &str,
        envelope: &SignedEnvelope,
    ) -> Result<VerifiedNotification, VerificationError> {
        let algorithm = self.resolve_algorithm(algorithm)?;
        let key = decoding_key(leaf)?;
        let validation = validation(algorithm);

        if self.verify_envelope {
            verify_token::<serde_json::Value>(envelope.as_str(), &key, &validation)?;
        }

        let data = envelope.data()?;
        let transaction_info: TransactionInfo =
            verify_token(&data.signed_transaction_info, &key, &validation)?;
        transaction_info
            .validate()
            .map_err(|e| VerificationError::decode(e.to_string()))?;

        let renewal_info = match &data.signed_renewal_info {
            Some(token) => verify_token(token, &key, &validation)?,
            None => RenewalInfo::default(),
        };

        let notification_uuid = NotificationUuid::new(envelope.claims.notification_uuid.clone())
            .map_err(|e| VerificationError::decode(e.to_string()))?;

        Ok(VerifiedNotification {
            notification_type: envelope.claims.notification_type,
            subtype: envelope.claims.subtype,
            notification_uuid,
            app_account_token: transaction_info.app_account_token.clone(),
            transaction_info,
            renewal_info,
        })
    }
}

fn decoding_key(leaf: &LeafPublicKey) -> Result<DecodingKey, VerificationError> {
    DecodingKey::from_ec_components(
        &URL_SAFE_NO_PAD.encode(leaf.x()),
        &URL_SAFE_NO_PAD.encode(leaf.y()),
    )
    .map_err(|e| VerificationError::UnsupportedKey(e.to_string()))
}

fn validation(algorithm: Algorithm) -> Validation {
    // Signed transaction tokens are historical records; their expiry is data,
    // not a validity window.
    let mut validation = Validation::new(algorithm);
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    validation
}

fn verify_token<T: DeserializeOwned>(
    token: &str,
    key: &DecodingKey,
    validation: &Validation,
) -> Result<T, VerificationError> {
    decode::<T>(token, key, validation)
        .map(|data| data.claims)
        .map_err(map_jwt_error)
}

fn map_jwt_error(e: JwtError) -> VerificationError {
    match e.kind() {
        ErrorKind::InvalidToken
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_) => {
            tracing::warn!("Malformed signed token: {}", e);
            VerificationError::decode(e.to_string())
        }
        ErrorKind::InvalidEcdsaKey | ErrorKind::InvalidKeyFormat => {
            tracing::warn!("Leaf key rejected: {}", e);
            VerificationError::UnsupportedKey(e.to_string())
        }
        _ => {
            tracing::warn!("Signed token failed verification: {}", e);
            VerificationError::SignatureInvalid
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::subscription::{NotificationSubtype, NotificationType};
    use crate::domain::verification::certificate_chain::CertificateChainVerifier;
    use crate::domain::verification::test_pki::{renewal_claims, transaction_claims, TestPki};
    use serde_json::json;

    fn verifier() -> ClaimVerifier {
        ClaimVerifier::new(vec![Algorithm::ES256], true)
    }

    fn leaf_key(pki: &TestPki) -> LeafPublicKey {
        CertificateChainVerifier::new(pki.root_certificate())
            .verify(&pki.chain())
            .unwrap()
    }

    fn envelope(payload: &str) -> SignedEnvelope {
        SignedEnvelope::parse(payload).unwrap()
    }

    // ══════════════════════════════════════════════════════════════
    // Algorithm allow-list
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn resolves_allowed_algorithm() {
        assert_eq!(verifier().resolve_algorithm("ES256").unwrap(), Algorithm::ES256);
    }

    #[test]
    fn rejects_none_algorithm() {
        let err = verifier().resolve_algorithm("none").unwrap_err();
        assert_eq!(err, VerificationError::UnsupportedAlgorithm("none".to_string()));
    }

    #[test]
    fn rejects_known_algorithm_outside_allow_list() {
        let err = verifier().resolve_algorithm("HS256").unwrap_err();
        assert!(matches!(err, VerificationError::UnsupportedAlgorithm(_)));
    }

    #[test]
    fn verify_refuses_disallowed_algorithm_before_touching_tokens() {
        let pki = TestPki::generate();
        let payload = pki.signed_payload(
            "SUBSCRIBED",
            None,
            "N1",
            transaction_claims("X1", "X1", "premium.yearly"),
            renewal_claims(1),
        );

        let err = verifier()
            .verify(&leaf_key(&pki), "HS256", &envelope(&payload))
            .unwrap_err();

        assert!(matches!(err, VerificationError::UnsupportedAlgorithm(_)));
    }

    // ══════════════════════════════════════════════════════════════
    // Verified claims
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn verified_notification_merges_outer_and_inner_claims() {
        let pki = TestPki::generate();
        let payload = pki.signed_payload(
            "DID_CHANGE_RENEWAL_STATUS",
            Some("AUTO_RENEW_DISABLED"),
            "N1",
            transaction_claims("X2", "X1", "premium.yearly"),
            renewal_claims(0),
        );

        let verified = verifier()
            .verify(&leaf_key(&pki), "ES256", &envelope(&payload))
            .unwrap();

        assert_eq!(verified.notification_type, NotificationType::DidChangeRenewalStatus);
        assert_eq!(verified.subtype, Some(NotificationSubtype::AutoRenewDisabled));
        assert_eq!(verified.notification_uuid.as_str(), "N1");
        assert_eq!(verified.app_account_token.as_deref(), Some("token-1"));
        assert_eq!(verified.transaction_info.transaction_id.as_str(), "X2");
        assert_eq!(verified.transaction_info.original_transaction_id.as_str(), "X1");
        assert!(!verified.renewal_info.is_renewable());
    }

    #[test]
    fn missing_renewal_token_defaults_to_renewable() {
        let pki = TestPki::generate();
        let claims = json!({
            "notificationType": "REFUND",
            "notificationUUID": "N5",
            "data": {
                "signedTransactionInfo": pki.sign(&transaction_claims("X1", "X1", "premium.yearly")),
            }
        });
        let payload = pki.sign(&claims);

        let verified = verifier()
            .verify(&leaf_key(&pki), "ES256", &envelope(&payload))
            .unwrap();

        assert!(verified.renewal_info.is_renewable());
    }

    // ══════════════════════════════════════════════════════════════
    // Signature failures
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn transaction_token_signed_by_other_key_is_rejected() {
        let pki = TestPki::generate();
        let forger = TestPki::generate();
        let claims = json!({
            "notificationType": "SUBSCRIBED",
            "notificationUUID": "N1",
            "data": {
                "signedTransactionInfo": forger.sign(&transaction_claims("X1", "X1", "premium.yearly")),
                "signedRenewalInfo": pki.sign(&renewal_claims(1)),
            }
        });
        let payload = pki.sign(&claims);

        let err = verifier()
            .verify(&leaf_key(&pki), "ES256", &envelope(&payload))
            .unwrap_err();

        assert_eq!(err, VerificationError::SignatureInvalid);
    }

    #[test]
    fn envelope_signed_by_other_key_is_rejected_when_checked() {
        let pki = TestPki::generate();
        let forger = TestPki::generate();
        let claims = json!({
            "notificationType": "SUBSCRIBED",
            "notificationUUID": "N1",
            "data": {
                "signedTransactionInfo": pki.sign(&transaction_claims("X1", "X1", "premium.yearly")),
                "signedRenewalInfo": pki.sign(&renewal_claims(1)),
            }
        });
        let payload = forger.sign(&claims);

        let strict = verifier().verify(&leaf_key(&pki), "ES256", &envelope(&payload));
        let lenient = ClaimVerifier::new(vec![Algorithm::ES256], false)
            .verify(&leaf_key(&pki), "ES256", &envelope(&payload));

        assert_eq!(strict.unwrap_err(), VerificationError::SignatureInvalid);
        assert!(lenient.is_ok());
    }

    #[test]
    fn malformed_nested_token_is_a_decode_error() {
        let pki = TestPki::generate();
        let claims = json!({
            "notificationType": "SUBSCRIBED",
            "notificationUUID": "N1",
            "data": { "signedTransactionInfo": "not-a-token" }
        });
        let payload = pki.sign(&claims);

        let err = verifier()
            .verify(&leaf_key(&pki), "ES256", &envelope(&payload))
            .unwrap_err();

        assert!(matches!(err, VerificationError::Decode(_)));
    }

    #[test]
    fn empty_transaction_id_is_a_decode_error() {
        let pki = TestPki::generate();
        let payload = pki.signed_payload(
            "SUBSCRIBED",
            None,
            "N1",
            transaction_claims("", "X1", "premium.yearly"),
            renewal_claims(1),
        );

        let err = verifier()
            .verify(&leaf_key(&pki), "ES256", &envelope(&payload))
            .unwrap_err();

        assert!(matches!(err, VerificationError::Decode(_)));
    }
}
