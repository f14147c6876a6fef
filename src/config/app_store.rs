//! App Store configuration

use std::path::PathBuf;
use std::str::FromStr;

use jsonwebtoken::Algorithm;
use serde::Deserialize;

use crate::domain::verification::Certificate;

use super::error::{ConfigError, ValidationError};

const SANDBOX_TEST_NOTIFICATION_URL: &str =
    "https://api.storekit-sandbox.itunes.apple.com/inApps/v1/notifications/test";

/// Notification verification and App Store Connect settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppStoreConfig {
    /// PEM file holding the trusted root certificate
    pub root_certificate_path: PathBuf,

    /// Comma separated signing algorithms accepted in envelope headers
    #[serde(default = "default_allowed_algorithms")]
    pub allowed_algorithms: String,

    /// Product identifier of the monthly plan; every other product is yearly
    pub monthly_product_id: String,

    /// Also verify the outer envelope signature
    #[serde(default = "default_true")]
    pub verify_envelope_signature: bool,

    /// App bundle identifier, required for App Store Connect calls
    #[serde(default)]
    pub bundle_id: Option<String>,

    #[serde(default)]
    pub key_id: Option<String>,

    #[serde(default)]
    pub issuer_id: Option<String>,

    /// PEM file holding the App Store Connect signing key
    #[serde(default)]
    pub private_key_path: Option<PathBuf>,

    #[serde(default = "default_test_notification_url")]
    pub test_notification_url: String,

    /// Ask Apple for a test notification once the server is listening
    #[serde(default)]
    pub request_test_notification_on_startup: bool,
}

impl AppStoreConfig {
    /// Parses the allow-list. Only elliptic curve algorithms are accepted
    /// since notification chains carry EC leaf keys.
    pub fn allowed_algorithms_list(&self) -> Result<Vec<Algorithm>, ValidationError> {
        let algorithms = self
            .allowed_algorithms
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| match Algorithm::from_str(name) {
                Ok(algorithm @ (Algorithm::ES256 | Algorithm::ES384)) => Ok(algorithm),
                _ => Err(ValidationError::UnsupportedAlgorithm(name.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()?;

        if algorithms.is_empty() {
            return Err(ValidationError::NoAlgorithmsAllowed);
        }
        Ok(algorithms)
    }

    /// Reads and parses the trusted root certificate.
    pub fn load_root_certificate(&self) -> Result<Certificate, ConfigError> {
        let path = self.root_certificate_path.display().to_string();
        let pem = std::fs::read(&self.root_certificate_path).map_err(|e| {
            ConfigError::FileUnreadable {
                path: path.clone(),
                reason: e.to_string(),
            }
        })?;
        Certificate::from_pem(&pem).map_err(|e| ConfigError::FileUnreadable {
            path,
            reason: e.to_string(),
        })
    }

    /// Whether all App Store Connect credentials are present.
    pub fn has_connect_credentials(&self) -> bool {
        self.bundle_id.is_some()
            && self.key_id.is_some()
            && self.issuer_id.is_some()
            && self.private_key_path.is_some()
    }

    /// Validate App Store configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.root_certificate_path.as_os_str().is_empty() {
            return Err(ValidationError::MissingRequired("APP_STORE__ROOT_CERTIFICATE_PATH"));
        }
        if self.monthly_product_id.is_empty() {
            return Err(ValidationError::MissingRequired("APP_STORE__MONTHLY_PRODUCT_ID"));
        }
        self.allowed_algorithms_list()?;

        if !self.test_notification_url.starts_with("https://") {
            return Err(ValidationError::UrlMustBeHttps("APP_STORE__TEST_NOTIFICATION_URL"));
        }
        if self.request_test_notification_on_startup && !self.has_connect_credentials() {
            return Err(ValidationError::MissingRequired(
                "APP_STORE__BUNDLE_ID, KEY_ID, ISSUER_ID and PRIVATE_KEY_PATH",
            ));
        }
        Ok(())
    }
}

fn default_allowed_algorithms() -> String {
    "ES256".to_string()
}

fn default_true() -> bool {
    true
}

fn default_test_notification_url() -> String {
    SANDBOX_TEST_NOTIFICATION_URL.to_string()
}
