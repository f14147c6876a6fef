//! TransactionLedger port - Append-only record of processed notifications.
//!
//! The ledger is the idempotency fence for App Store notifications. The App
//! Store delivers at least once, so the same `notificationUUID` can arrive
//! twice, possibly at the same moment on two servers.
//!
//! `has_processed` is a fast path only. The guarantee comes from the store
//! rejecting a second row with the same UUID.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::{DomainError, NotificationUuid};
use crate::domain::subscription::TransactionRecord;

/// Errors from ledger writes.
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    /// A row for this notification UUID already exists.
    #[error("Notification {0} already recorded")]
    Conflict(NotificationUuid),

    /// The underlying store failed.
    #[error(transparent)]
    Storage(#[from] DomainError),
}

/// Port for the transaction ledger.
///
/// Implementations must enforce uniqueness of `notification_uuid` in the
/// store itself (PRIMARY KEY or equivalent).
///
/// Notification processing only reads through this port. Its rows are
/// written by `SubscriptionRepository::commit` together with the state
/// change, against the same key. `record` appends a row on its own, for
/// ledger entries that carry no state change such as backfills.
#[async_trait]
pub trait TransactionLedger: Send + Sync {
    /// Returns true if a record exists for the notification UUID.
    async fn has_processed(&self, notification_uuid: &NotificationUuid)
        -> Result<bool, DomainError>;

    /// Appends a record.
    ///
    /// Returns `LedgerError::Conflict` if the UUID is already recorded.
    async fn record(&self, entry: TransactionRecord) -> Result<(), LedgerError>;

    /// Find a record by notification UUID.
    async fn find_by_notification_uuid(
        &self,
        notification_uuid: &NotificationUuid,
    ) -> Result<Option<TransactionRecord>, DomainError>;
}
