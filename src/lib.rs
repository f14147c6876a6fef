//! billing-sync - App Store subscription synchronisation
//!
//! Receives signed App Store server notifications, proves they come from
//! Apple, and applies each one exactly once to the owning user's
//! subscription state.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
