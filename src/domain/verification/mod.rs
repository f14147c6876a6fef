//! Verification of signed App Store server notifications.
//!
//! # Module Structure
//!
//! - `payload_codec` - Base64url segment decoding
//! - `envelope` - Signed envelope header and claims
//! - `certificate_chain` - X.509 chain verification against a trusted root
//! - `claim_verifier` - Signature checks on the nested tokens
//! - `errors` - Verification error taxonomy
//!
//! # Order of checks
//!
//! 1. Decode the envelope header and claims
//! 2. Resolve the declared algorithm against the allow-list
//! 3. Verify the `x5c` chain up to the trusted root
//! 4. Verify the nested tokens with the leaf key

mod certificate_chain;
mod claim_verifier;
mod envelope;
mod errors;
mod payload_codec;

#[cfg(test)]
pub(crate) mod test_pki;

pub use certificate_chain::{Certificate, CertificateChainVerifier, LeafPublicKey};
pub use claim_verifier::ClaimVerifier;
pub use envelope::{EnvelopeHeader, NotificationClaims, NotificationData, SignedEnvelope};
pub use errors::VerificationError;
pub use payload_codec::{decode_json, decode_segment};

use crate::domain::subscription::VerifiedNotification;

/// Turns a raw `signedPayload` into a [`VerifiedNotification`].
///
/// Pure and synchronous; safe to share across request tasks.
#[derive(Debug, Clone)]
pub struct NotificationAuthenticator {
    chain_verifier: CertificateChainVerifier,
    claim_verifier: ClaimVerifier,
}

impl NotificationAuthenticator {
    pub fn new(chain_verifier: CertificateChainVerifier, claim_verifier: ClaimVerifier) -> Self {
        Self {
            chain_verifier,
            claim_verifier,
        }
    }

    pub fn authenticate(
        &self,
        signed_payload: &str,
    ) -> Result<VerifiedNotification, VerificationError> {
        let envelope = SignedEnvelope::parse(signed_payload)?;
        self.claim_verifier.resolve_algorithm(&envelope.header.alg)?;

        let chain = envelope.certificates()?;
        let leaf = self.chain_verifier.verify(&chain)?;

        self.claim_verifier
            .verify(&leaf, &envelope.header.alg, &envelope)
    }
}
