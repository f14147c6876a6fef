//! App Store Connect API client.
//!
//! Authenticates with a short-lived ES256 token signed by the team's
//! in-app purchase key and asks the App Store to send a test notification
//! to the configured webhook.

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::foundation::Timestamp;

const AUDIENCE: &str = "appstoreconnect-v1";
const TOKEN_LIFETIME_SECS: i64 = 30 * 60;

/// Errors from the App Store Connect API client.
#[derive(Debug, Error)]
pub enum AppStoreConnectError {
    #[error("Invalid signing key: {0}")]
    InvalidKey(String),

    #[error("Failed to sign token: {0}")]
    Signing(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("App Store Connect API error ({status}): {body}")]
    Api { status: u16, body: String },
}

/// Claims of an App Store Connect API token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectClaims {
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub aud: String,
    pub bid: String,
}

/// Response to a test notification request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestNotificationResponse {
    pub test_notification_token: String,
}

/// Identity used to sign API tokens.
pub struct ConnectCredentials {
    pub key_id: String,
    pub issuer_id: String,
    pub bundle_id: String,
    signing_key: EncodingKey,
}

impl ConnectCredentials {
    /// `private_key_pem` is the PKCS#8 `.p8` file downloaded from App Store
    /// Connect.
    pub fn from_pem(
        key_id: impl Into<String>,
        issuer_id: impl Into<String>,
        bundle_id: impl Into<String>,
        private_key_pem: &[u8],
    ) -> Result<Self, AppStoreConnectError> {
        let signing_key = EncodingKey::from_ec_pem(private_key_pem)
            .map_err(|e| AppStoreConnectError::InvalidKey(e.to_string()))?;
        Ok(Self {
            key_id: key_id.into(),
            issuer_id: issuer_id.into(),
            bundle_id: bundle_id.into(),
            signing_key,
        })
    }
}

/// App Store Connect API client.
pub struct AppStoreConnectClient {
    credentials: ConnectCredentials,
    test_notification_url: String,
    http_client: reqwest::Client,
}

impl AppStoreConnectClient {
    pub fn new(credentials: ConnectCredentials, test_notification_url: impl Into<String>) -> Self {
        Self {
            credentials,
            test_notification_url: test_notification_url.into(),
            http_client: reqwest::Client::new(),
        }
    }

    /// Signs an API token issued at `issued_at`, valid for 30 minutes.
    pub fn signed_token(&self, issued_at: Timestamp) -> Result<String, AppStoreConnectError> {
        let mut header = Header::new(Algorithm::ES256);
        header.kid = Some(self.credentials.key_id.clone());

        let claims = ConnectClaims {
            iss: self.credentials.issuer_id.clone(),
            iat: issued_at.as_unix_secs(),
            exp: issued_at.plus_secs(TOKEN_LIFETIME_SECS).as_unix_secs(),
            aud: AUDIENCE.to_string(),
            bid: self.credentials.bundle_id.clone(),
        };

        encode(&header, &claims, &self.credentials.signing_key)
            .map_err(|e| AppStoreConnectError::Signing(e.to_string()))
    }

    /// Asks the App Store to send a TEST notification to the webhook.
    pub async fn request_test_notification(
        &self,
    ) -> Result<TestNotificationResponse, AppStoreConnectError> {
        let token = self.signed_token(Timestamp::now())?;

        let response = self
            .http_client
            .post(&self.test_notification_url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AppStoreConnectError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, error = %body, "Test notification request failed");
            return Err(AppStoreConnectError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TestNotificationResponse = response
            .json()
            .await
            .map_err(|e| AppStoreConnectError::Network(e.to_string()))?;
        tracing::info!(
            test_notification_token = %parsed.test_notification_token,
            "Requested App Store test notification"
        );
        Ok(parsed)
    }
}
