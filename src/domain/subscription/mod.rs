//! Subscription domain module.
//!
//! Handles App Store subscription state and the transitions notifications
//! drive through it.
//!
//! # Module Structure
//!
//! - `state` - Subscription state owned by a user
//! - `notification` - Notification types and verified claims
//! - `transaction` - Ledger records for processed notifications
//! - `state_machine` - Pure transition function
//! - `side_effect` - Post-commit instructions
//! - `errors` - Processing outcomes and errors

mod errors;
mod notification;
mod side_effect;
mod state;
mod state_machine;
mod transaction;

pub use errors::{NotificationError, NotificationOutcome};
pub use notification::{
    NotificationSubtype, NotificationType, RenewalInfo, TransactionInfo, VerifiedNotification,
};
pub use side_effect::{
    BillingFailureNotice, SideEffect, BILLING_FAILURE_MESSAGE, BILLING_FAILURE_SUBJECT,
};
pub use state::{
    AppStoreSubscription, Platform, ProductCatalog, ProductType, SubscriptionState,
    SubscriptionStatus, UserSubscription,
};
pub use state_machine::{SubscriptionStateMachine, Transition};
pub use transaction::{LedgeredType, TransactionRecord};
