//! Generated root → intermediate → leaf PKI for verification tests.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rcgen::{BasicConstraints, CertificateParams, DnType, IsCa, KeyPair};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::certificate_chain::Certificate;

pub struct TestPki {
    root_der: Vec<u8>,
    root_pem: String,
    intermediate_der: Vec<u8>,
    leaf_der: Vec<u8>,
    leaf_key_pem: String,
}

impl TestPki {
    pub fn generate() -> Self {
        let root_key = KeyPair::generate().unwrap();
        let root = ca_params("Test Root").self_signed(&root_key).unwrap();

        let intermediate_key = KeyPair::generate().unwrap();
        let intermediate = ca_params("Test Intermediate")
            .signed_by(&intermediate_key, &root, &root_key)
            .unwrap();

        let leaf_key = KeyPair::generate().unwrap();
        let leaf = named_params("Test Leaf")
            .signed_by(&leaf_key, &intermediate, &intermediate_key)
            .unwrap();

        Self {
            root_der: root.der().to_vec(),
            root_pem: root.pem(),
            intermediate_der: intermediate.der().to_vec(),
            leaf_der: leaf.der().to_vec(),
            leaf_key_pem: leaf_key.serialize_pem(),
        }
    }

    pub fn root_certificate(&self) -> Certificate {
        Certificate::from_der(self.root_der.clone()).unwrap()
    }

    pub fn root_pem(&self) -> &str {
        &self.root_pem
    }

    /// Leaf first, as the App Store sends it.
    pub fn chain(&self) -> Vec<Certificate> {
        vec![
            Certificate::from_der(self.leaf_der.clone()).unwrap(),
            Certificate::from_der(self.intermediate_der.clone()).unwrap(),
        ]
    }

    pub fn x5c(&self) -> Vec<String> {
        vec![
            STANDARD.encode(&self.leaf_der),
            STANDARD.encode(&self.intermediate_der),
        ]
    }

    /// Signs `claims` with the leaf key.
    pub fn sign<T: Serialize>(&self, claims: &T) -> String {
        let mut header = Header::new(Algorithm::ES256);
        header.x5c = Some(self.x5c());
        let key = EncodingKey::from_ec_pem(self.leaf_key_pem.as_bytes()).unwrap();
        encode(&header, claims, &key).unwrap()
    }

    /// A complete `signedPayload` for a notification.
    pub fn signed_payload(
        &self,
        notification_type: &str,
        subtype: Option<&str>,
        notification_uuid: &str,
        transaction: Value,
        renewal: Value,
    ) -> String {
        let claims = json!({
            "notificationType": notification_type,
            "subtype": subtype,
            "notificationUUID": notification_uuid,
            "data": {
                "signedTransactionInfo": self.sign(&transaction),
                "signedRenewalInfo": self.sign(&renewal),
            }
        });
        self.sign(&claims)
    }
}

pub fn transaction_claims(transaction_id: &str, original_transaction_id: &str, product_id: &str) -> Value {
    json!({
        "transactionId": transaction_id,
        "originalTransactionId": original_transaction_id,
        "productId": product_id,
        "appAccountToken": "token-1",
        "purchaseDate": 1_705_276_800_000_i64,
        "expiresDate": 1_736_899_200_000_i64,
    })
}

pub fn renewal_claims(auto_renew_status: i64) -> Value {
    json!({ "autoRenewStatus": auto_renew_status })
}

fn named_params(common_name: &str) -> CertificateParams {
    let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
    // Unique names so chains from separate PKIs never match by name alone.
    params
        .distinguished_name
        .push(DnType::CommonName, format!("{} {}", common_name, Uuid::new_v4()));
    params
}

fn ca_params(common_name: &str) -> CertificateParams {
    let mut params = named_params(common_name);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params
}
