//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors)
//! - `subscription` - Subscription state and the notification state machine
//! - `verification` - Authentication of signed App Store notifications

pub mod foundation;
pub mod subscription;
pub mod verification;
