//! BillingNotifier port - Delivery of billing failure emails.
//!
//! Delivery is best-effort. A failed send never undoes a committed
//! subscription change.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::subscription::BillingFailureNotice;

/// Errors from the email gateway.
#[derive(Debug, Clone, Error)]
pub enum NotifierError {
    #[error("Email provider error: {0}")]
    Provider(String),

    #[error("Email provider unreachable: {0}")]
    Network(String),
}

/// Port for sending billing emails.
#[async_trait]
pub trait BillingNotifier: Send + Sync {
    async fn send_billing_failure(&self, notice: &BillingFailureNotice) -> Result<(), NotifierError>;
}
