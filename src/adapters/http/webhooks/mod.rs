//! HTTP adapter for inbound webhooks.
//!
//! - `POST /api/webhooks/app-store` - App Store server notifications
//! - `GET /health` - Liveness probe

mod dto;
mod handlers;
mod routes;

pub use dto::{AppStoreNotificationRequest, ErrorResponse, NotificationAcknowledgement};
pub use handlers::{NotificationApiError, WebhookAppState};
pub use routes::{webhook_router, webhook_routes};
