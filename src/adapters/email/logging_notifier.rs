//! Logging billing notifier.
//!
//! Writes each billing failure notice to the log instead of sending it.
//! Used when no email provider is configured. Keeps no state, so it is safe
//! for a long-running server.

use async_trait::async_trait;

use crate::domain::subscription::BillingFailureNotice;
use crate::ports::{BillingNotifier, NotifierError};

/// `BillingNotifier` that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingBillingNotifier;

impl LoggingBillingNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BillingNotifier for LoggingBillingNotifier {
    async fn send_billing_failure(&self, notice: &BillingFailureNotice) -> Result<(), NotifierError> {
        tracing::info!(
            user_id = %notice.user_id,
            subject = %notice.subject,
            "Billing failure email not sent: no email provider configured"
        );
        Ok(())
    }
}
