//! Email adapters for the `BillingNotifier` port.
//!
//! - `ResendBillingNotifier` - Resend HTTP API
//! - `LoggingBillingNotifier` - Log only, when no provider is configured
//! - `RecordingBillingNotifier` - In-memory capture for tests

mod logging_notifier;
mod recording_notifier;
mod resend_notifier;

pub use logging_notifier::LoggingBillingNotifier;
pub use recording_notifier::RecordingBillingNotifier;
pub use resend_notifier::ResendBillingNotifier;
