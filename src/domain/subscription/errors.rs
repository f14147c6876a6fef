//! Notification processing outcomes and errors.
//!
//! Outcomes are every way a notification can be acknowledged; errors are the
//! ways it can be refused. The HTTP status decides whether the App Store
//! redelivers:
//! - 200: acknowledged, no redelivery
//! - 403: rejected payload, no redelivery
//! - 500: storage failure, redelivered later

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::verification::VerificationError;

/// How an authenticated notification was acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationOutcome {
    /// State and/or ledger changes were committed.
    Applied,
    /// The notification UUID was already in the ledger.
    AlreadyProcessed,
    /// No user holds the notification's account token.
    UnknownAccount,
    /// The notification type carries nothing to apply.
    Ignored,
}

impl NotificationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationOutcome::Applied => "applied",
            NotificationOutcome::AlreadyProcessed => "already_processed",
            NotificationOutcome::UnknownAccount => "unknown_account",
            NotificationOutcome::Ignored => "ignored",
        }
    }
}

/// Errors that refuse a notification.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error(transparent)]
    Verification(#[from] VerificationError),

    /// Reading or committing subscription data failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl NotificationError {
    /// Returns true if the App Store should redeliver this notification.
    pub fn is_retryable(&self) -> bool {
        matches!(self, NotificationError::Storage(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            NotificationError::Verification(err) => err.status_code(),
            NotificationError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
