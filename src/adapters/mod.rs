//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `postgres` - PostgreSQL subscription store and ledger
//! - `memory` - In-memory subscription store and ledger
//! - `email` - Billing email delivery
//! - `app_store` - App Store Connect API client
//! - `http` - Axum webhook endpoints

pub mod app_store;
pub mod email;
pub mod http;
pub mod memory;
pub mod postgres;

pub use email::{LoggingBillingNotifier, RecordingBillingNotifier, ResendBillingNotifier};
pub use memory::InMemorySubscriptionStore;
pub use postgres::PostgresSubscriptionStore;
