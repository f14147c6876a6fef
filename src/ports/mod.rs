//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Persistence Ports
//!
//! - `SubscriptionRepository` - User lookup and atomic state + ledger commits
//! - `TransactionLedger` - Idempotency record of processed notifications
//!
//! ## Notification Ports
//!
//! - `BillingNotifier` - Billing failure email delivery

mod billing_notifier;
mod subscription_repository;
mod transaction_ledger;

pub use billing_notifier::{BillingNotifier, NotifierError};
pub use subscription_repository::SubscriptionRepository;
pub use transaction_ledger::{LedgerError, TransactionLedger};
