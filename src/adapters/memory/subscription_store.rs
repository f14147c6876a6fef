//! In-memory subscription store.
//!
//! Implements both `SubscriptionRepository` and `TransactionLedger` over one
//! mutex, so a commit is atomic and the ledger key is unique exactly as the
//! PostgreSQL adapter guarantees. Useful for:
//! - Tests
//! - Local development without a database
//!
//! Does not persist data across restarts.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::foundation::{DomainError, NotificationUuid, UserId};
use crate::domain::subscription::{TransactionRecord, Transition, UserSubscription};
use crate::ports::{LedgerError, SubscriptionRepository, TransactionLedger};

#[derive(Default)]
struct StoreState {
    users: HashMap<UserId, UserSubscription>,
    /// Ledger rows in insertion order.
    ledger: Vec<TransactionRecord>,
    recorded: HashSet<NotificationUuid>,
}

impl StoreState {
    fn append(&mut self, entry: TransactionRecord) -> Result<(), LedgerError> {
        if !self.recorded.insert(entry.notification_uuid.clone()) {
            return Err(LedgerError::Conflict(entry.notification_uuid));
        }
        self.ledger.push(entry);
        Ok(())
    }
}

/// In-memory implementation of the persistence ports.
#[derive(Default)]
pub struct InMemorySubscriptionStore {
    state: Mutex<StoreState>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a user.
    pub fn insert_user(&self, user: UserSubscription) {
        self.lock().users.insert(user.user_id.clone(), user);
    }

    /// Returns the number of ledger rows.
    pub fn ledger_len(&self) -> usize {
        self.lock().ledger.len()
    }

    /// Returns all ledger rows, oldest first.
    pub fn ledger_entries(&self) -> Vec<TransactionRecord> {
        self.lock().ledger.clone()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        // Every write completes before the guard drops; a poisoned lock still
        // holds consistent data.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionStore {
    async fn find_by_account_token(
        &self,
        app_account_token: &str,
    ) -> Result<Option<UserSubscription>, DomainError> {
        Ok(self
            .lock()
            .users
            .values()
            .find(|u| u.app_account_token == app_account_token)
            .cloned())
    }

    async fn find_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Option<UserSubscription>, DomainError> {
        Ok(self.lock().users.get(user_id).cloned())
    }

    async fn commit(
        &self,
        user_id: &UserId,
        decide: &(dyn for<'s> Fn(&'s UserSubscription) -> Transition + Send + Sync),
    ) -> Result<Transition, LedgerError> {
        let mut state = self.lock();

        let transition = match state.users.get(user_id) {
            Some(user) => decide(user),
            None => return Err(DomainError::user_not_found(user_id).into()),
        };

        if let Some(entry) = &transition.ledger_entry {
            state.append(entry.clone())?;
        }
        if let Some(new_state) = &transition.state {
            if let Some(user) = state.users.get_mut(user_id) {
                user.state = new_state.clone();
            }
        }
        Ok(transition)
    }
}

#[async_trait]
impl TransactionLedger for InMemorySubscriptionStore {
    async fn has_processed(&self, notification_uuid: &NotificationUuid) -> Result<bool, DomainError> {
        Ok(self.lock().recorded.contains(notification_uuid))
    }

    async fn record(&self, entry: TransactionRecord) -> Result<(), LedgerError> {
        self.lock().append(entry)
    }

    async fn find_by_notification_uuid(
        &self,
        notification_uuid: &NotificationUuid,
    ) -> Result<Option<TransactionRecord>, DomainError> {
        Ok(self
            .lock()
            .ledger
            .iter()
            .find(|e| &e.notification_uuid == notification_uuid)
            .cloned())
    }
}
