//! PostgreSQL adapters.
//!
//! Persistent storage for user subscriptions and the App Store transaction
//! ledger.

mod subscription_store;

pub use subscription_store::PostgresSubscriptionStore;
