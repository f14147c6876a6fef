//! HTTP handlers for inbound App Store notifications.
//!
//! Status codes drive App Store redelivery:
//! - 200: acknowledged (applied, replayed, unknown account, or ignored)
//! - 403: payload rejected, never redelivered usefully
//! - 500: storage failure, App Store retries later

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::application::{HandleAppStoreNotificationCommand, HandleAppStoreNotificationHandler};
use crate::domain::subscription::NotificationError;
use crate::domain::verification::VerificationError;

use super::dto::{
    AppStoreNotificationRequest, ErrorResponse, HealthResponse, NotificationAcknowledgement,
};

/// Shared state for webhook handlers.
#[derive(Clone)]
pub struct WebhookAppState {
    pub notification_handler: Arc<HandleAppStoreNotificationHandler>,
}

impl WebhookAppState {
    pub fn new(notification_handler: Arc<HandleAppStoreNotificationHandler>) -> Self {
        Self {
            notification_handler,
        }
    }
}

/// POST /api/webhooks/app-store - Handle an App Store server notification
pub async fn handle_app_store_notification(
    State(state): State<WebhookAppState>,
    body: Result<Json<AppStoreNotificationRequest>, JsonRejection>,
) -> Result<impl IntoResponse, NotificationApiError> {
    let Json(request) = body.map_err(|rejection| {
        tracing::warn!(error = %rejection, "Rejected malformed notification body");
        NotificationError::from(VerificationError::decode(rejection.body_text()))
    })?;

    let cmd = HandleAppStoreNotificationCommand {
        signed_payload: request.signed_payload,
    };
    let result = state.notification_handler.handle(cmd).await?;

    Ok((StatusCode::OK, Json(NotificationAcknowledgement::from(result))))
}

/// GET /health - Liveness probe
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts notification errors to HTTP responses.
#[derive(Debug)]
pub struct NotificationApiError(NotificationError);

impl From<NotificationError> for NotificationApiError {
    fn from(err: NotificationError) -> Self {
        Self(err)
    }
}

impl IntoResponse for NotificationApiError {
    fn into_response(self) -> axum::response::Response {
        let error_code = match &self.0 {
            NotificationError::Verification(VerificationError::Decode(_)) => "MALFORMED_PAYLOAD",
            NotificationError::Verification(VerificationError::ChainNotRooted)
            | NotificationError::Verification(VerificationError::ChainSignature) => {
                "UNTRUSTED_CERTIFICATE_CHAIN"
            }
            NotificationError::Verification(VerificationError::UnsupportedAlgorithm(_)) => {
                "UNSUPPORTED_ALGORITHM"
            }
            NotificationError::Verification(VerificationError::SignatureInvalid) => {
                "INVALID_SIGNATURE"
            }
            NotificationError::Verification(VerificationError::UnsupportedKey(_)) => {
                "UNSUPPORTED_KEY"
            }
            NotificationError::Storage(_) => "INTERNAL_ERROR",
        };

        // Storage details stay in the logs.
        let message = match &self.0 {
            NotificationError::Storage(_) => "Internal error".to_string(),
            other => other.to_string(),
        };
        let body = ErrorResponse::new(error_code, message);
        (self.0.status_code(), Json(body)).into_response()
    }
}
