//! Request and response DTOs for the webhook endpoints.

use serde::{Deserialize, Serialize};

use crate::application::HandleAppStoreNotificationResult;

/// Body the App Store posts to the notification endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppStoreNotificationRequest {
    pub signed_payload: String,
}

/// Body returned for every acknowledged notification.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationAcknowledgement {
    pub notification_uuid: String,
    pub outcome: String,
}

impl From<HandleAppStoreNotificationResult> for NotificationAcknowledgement {
    fn from(result: HandleAppStoreNotificationResult) -> Self {
        Self {
            notification_uuid: result.notification_uuid.to_string(),
            outcome: result.outcome.as_str().to_string(),
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Response DTO
// ════════════════════════════════════════════════════════════════════════════════

/// Standard error response for API errors.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}
