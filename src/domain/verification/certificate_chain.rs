//! Certificate chain verification against a locally trusted root.
//!
//! The sender supplies the chain leaf first. Trust runs the other way: the
//! trusted root must have issued the last certificate, and every certificate
//! must be signed by the one after it. Any broken link rejects the chain.

use x509_parser::oid_registry::OID_KEY_TYPE_EC_PUBLIC_KEY;
use x509_parser::pem::parse_x509_pem;
use x509_parser::prelude::{FromDer, X509Certificate};

use super::errors::VerificationError;
use super::payload_codec::decode_certificate;

/// A DER-encoded X.509 certificate known to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    der: Vec<u8>,
}

impl Certificate {
    pub fn from_der(der: Vec<u8>) -> Result<Self, VerificationError> {
        X509Certificate::from_der(&der)
            .map_err(|e| VerificationError::decode(format!("invalid certificate: {}", e)))?;
        Ok(Self { der })
    }

    /// Parses one `x5c` header entry.
    pub fn from_base64(entry: &str) -> Result<Self, VerificationError> {
        Self::from_der(decode_certificate(entry)?)
    }

    /// Parses the first certificate of a PEM document.
    pub fn from_pem(pem: &[u8]) -> Result<Self, VerificationError> {
        let (_, pem) = parse_x509_pem(pem)
            .map_err(|e| VerificationError::decode(format!("invalid PEM: {}", e)))?;
        Self::from_der(pem.contents)
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    fn parsed(&self) -> Result<X509Certificate<'_>, VerificationError> {
        X509Certificate::from_der(&self.der)
            .map(|(_, cert)| cert)
            .map_err(|e| VerificationError::decode(format!("invalid certificate: {}", e)))
    }
}

/// Uncompressed SEC1 elliptic curve point taken from a verified leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafPublicKey {
    point: Vec<u8>,
}

impl LeafPublicKey {
    /// Accepts `0x04 || X || Y` for P-256 (65 bytes) or P-384 (97 bytes).
    pub fn from_sec1(point: &[u8]) -> Result<Self, VerificationError> {
        match (point.first(), point.len()) {
            (Some(0x04), 65) | (Some(0x04), 97) => Ok(Self {
                point: point.to_vec(),
            }),
            (_, len) => Err(VerificationError::UnsupportedKey(format!(
                "expected an uncompressed P-256 or P-384 point, got {} bytes",
                len
            ))),
        }
    }

    fn coordinate_len(&self) -> usize {
        (self.point.len() - 1) / 2
    }

    pub fn x(&self) -> &[u8] {
        &self.point[1..1 + self.coordinate_len()]
    }

    pub fn y(&self) -> &[u8] {
        &self.point[1 + self.coordinate_len()..]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.point
    }
}

/// Verifies sender-supplied chains against one trusted root.
#[derive(Debug, Clone)]
pub struct CertificateChainVerifier {
    root: Certificate,
}

impl CertificateChainVerifier {
    pub fn new(root: Certificate) -> Self {
        Self { root }
    }

    /// Proves `chain[0]` is transitively signed by the trusted root and
    /// returns its public key.
    pub fn verify(&self, chain: &[Certificate]) -> Result<LeafPublicKey, VerificationError> {
        let last = chain
            .last()
            .ok_or_else(|| VerificationError::decode("x5c chain is empty"))?;

        let root = self.root.parsed()?;
        let highest = last.parsed()?;
        if !issued_by(&highest, &root) {
            return Err(VerificationError::ChainNotRooted);
        }

        // The link from the last certificate to the root was proven above.
        for pair in chain.windows(2) {
            let child = pair[0].parsed()?;
            let issuer = pair[1].parsed()?;
            if !issuer.is_ca() || !issued_by(&child, &issuer) {
                return Err(VerificationError::ChainSignature);
            }
        }

        let leaf = chain[0].parsed()?;
        leaf_public_key(&leaf)
    }
}

fn issued_by(child: &X509Certificate<'_>, issuer: &X509Certificate<'_>) -> bool {
    child.issuer().as_raw() == issuer.subject().as_raw()
        && child.verify_signature(Some(issuer.public_key())).is_ok()
}

fn leaf_public_key(leaf: &X509Certificate<'_>) -> Result<LeafPublicKey, VerificationError> {
    let spki = leaf.public_key();
    if spki.algorithm.algorithm != OID_KEY_TYPE_EC_PUBLIC_KEY {
        return Err(VerificationError::UnsupportedKey(format!(
            "leaf key algorithm {} is not an elliptic curve key",
            spki.algorithm.algorithm
        )));
    }
    LeafPublicKey::from_sec1(&spki.subject_public_key.data)
}
