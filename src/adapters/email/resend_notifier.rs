//! Resend billing notifier.
//!
//! Sends billing failure emails through the Resend HTTP API.
//! Secrets are handled via `secrecy::SecretString`.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::time::Duration;

use crate::domain::subscription::BillingFailureNotice;
use crate::ports::{BillingNotifier, NotifierError};

const RESEND_API_URL: &str = "https://api.resend.com";

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
}

/// Resend adapter for the `BillingNotifier` port.
pub struct ResendBillingNotifier {
    api_key: SecretString,
    from: String,
    api_base_url: String,
    http_client: reqwest::Client,
}

impl ResendBillingNotifier {
    /// `from` is a full header value, e.g. `Billing <billing@example.com>`.
    ///
    /// `timeout` bounds each send, connect included.
    pub fn new(
        api_key: SecretString,
        from: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NotifierError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifierError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            from: from.into(),
            api_base_url: RESEND_API_URL.to_string(),
            http_client,
        })
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

#[async_trait]
impl BillingNotifier for ResendBillingNotifier {
    async fn send_billing_failure(&self, notice: &BillingFailureNotice) -> Result<(), NotifierError> {
        let url = format!("{}/emails", self.api_base_url);
        let body = SendEmailRequest {
            from: &self.from,
            to: [notice.email.as_str()],
            subject: &notice.subject,
            text: &notice.message,
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifierError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, error = %error_text, "Resend send failed");
            return Err(NotifierError::Provider(format!(
                "Resend API error ({}): {}",
                status, error_text
            )));
        }

        tracing::info!(user_id = %notice.user_id, "Sent billing failure email");
        Ok(())
    }
}
