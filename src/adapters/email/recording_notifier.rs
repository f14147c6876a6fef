//! Recording billing notifier.
//!
//! Captures notices instead of sending them so tests can assert on them.
//! Keeps every notice, so it is not meant for a running server.

use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};

use crate::domain::subscription::BillingFailureNotice;
use crate::ports::{BillingNotifier, NotifierError};

#[derive(Default)]
pub struct RecordingBillingNotifier {
    sent: Mutex<Vec<BillingFailureNotice>>,
}

impl RecordingBillingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every notice received so far.
    pub fn sent(&self) -> Vec<BillingFailureNotice> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl BillingNotifier for RecordingBillingNotifier {
    async fn send_billing_failure(&self, notice: &BillingFailureNotice) -> Result<(), NotifierError> {
        tracing::debug!(user_id = %notice.user_id, "Recorded billing failure email");
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice.clone());
        Ok(())
    }
}
