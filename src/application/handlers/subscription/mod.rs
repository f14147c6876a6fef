//! Subscription command handlers.

mod handle_app_store_notification;

pub use handle_app_store_notification::{
    HandleAppStoreNotificationCommand, HandleAppStoreNotificationHandler,
    HandleAppStoreNotificationResult,
};
