//! SubscriptionRepository port - User subscriptions and their atomic updates.
//!
//! A notification changes at most one user's subscription and appends at
//! most one ledger row. Both land in a single commit or neither does.
//!
//! The transition is computed inside the commit from the subscription as it
//! is stored at that moment, with the row locked. Two notifications for the
//! same user therefore apply one after the other, and neither can write back
//! a snapshot the other has already replaced.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, UserId};
use crate::domain::subscription::{Transition, UserSubscription};

use super::transaction_ledger::LedgerError;

/// Port for reading and committing user subscriptions.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Find the user whose stored account token equals `app_account_token`.
    async fn find_by_account_token(
        &self,
        app_account_token: &str,
    ) -> Result<Option<UserSubscription>, DomainError>;

    /// Find a user by ID.
    async fn find_by_user_id(&self, user_id: &UserId)
        -> Result<Option<UserSubscription>, DomainError>;

    /// Locks the user's subscription, runs `decide` on it and persists the
    /// resulting state and ledger entry atomically.
    ///
    /// Returns the transition that was applied. If its ledger entry's UUID
    /// already exists nothing is written and `LedgerError::Conflict` is
    /// returned. A missing user is a `LedgerError::Storage` error.
    ///
    /// This is the write path for notification processing; the ledger row is
    /// inserted here, not through `TransactionLedger::record`.
    async fn commit(
        &self,
        user_id: &UserId,
        decide: &(dyn for<'s> Fn(&'s UserSubscription) -> Transition + Send + Sync),
    ) -> Result<Transition, LedgerError>;
}
