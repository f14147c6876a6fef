//! Axum router configuration for webhook endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{handle_app_store_notification, health, WebhookAppState};

/// Create the webhook router.
///
/// Webhooks carry no user authentication; the signed payload is verified
/// instead.
///
/// # Routes
/// - `POST /app-store` - Handle App Store server notifications
pub fn webhook_routes() -> Router<WebhookAppState> {
    Router::new().route("/app-store", post(handle_app_store_notification))
}

/// Create the complete application router.
///
/// # Routes
/// - `GET /health` - Liveness probe
/// - `POST /api/webhooks/app-store` - App Store server notifications
pub fn webhook_router() -> Router<WebhookAppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/api/webhooks", webhook_routes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::email::RecordingBillingNotifier;
    use crate::adapters::memory::InMemorySubscriptionStore;
    use crate::application::HandleAppStoreNotificationHandler;
    use crate::domain::foundation::{DomainError, NotificationUuid, UserId};
    use crate::domain::subscription::{
        ProductCatalog, SubscriptionState, SubscriptionStateMachine, TransactionRecord,
        UserSubscription,
    };
    use crate::domain::verification::test_pki::{renewal_claims, transaction_claims, TestPki};
    use crate::domain::verification::{
        CertificateChainVerifier, ClaimVerifier, NotificationAuthenticator,
    };
    use crate::ports::{LedgerError, TransactionLedger};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use jsonwebtoken::Algorithm;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    // ───────────────────────────────────────────────────────────────
    // Test doubles
    // ───────────────────────────────────────────────────────────────

    struct UnavailableLedger;

    #[async_trait]
    impl TransactionLedger for UnavailableLedger {
        async fn has_processed(&self, _: &NotificationUuid) -> Result<bool, DomainError> {
            Err(DomainError::database("pool timed out"))
        }

        async fn record(&self, _: TransactionRecord) -> Result<(), LedgerError> {
            Err(DomainError::database("pool timed out").into())
        }

        async fn find_by_notification_uuid(
            &self,
            _: &NotificationUuid,
        ) -> Result<Option<TransactionRecord>, DomainError> {
            Err(DomainError::database("pool timed out"))
        }
    }

    fn app_with_ledger(pki: &TestPki, ledger: Option<Arc<dyn TransactionLedger>>) -> Router {
        let store = Arc::new(InMemorySubscriptionStore::new());
        store.insert_user(UserSubscription {
            user_id: UserId::new("user-1").unwrap(),
            email: "ada@example.com".to_string(),
            app_account_token: "token-1".to_string(),
            state: SubscriptionState::default(),
        });
        let ledger: Arc<dyn TransactionLedger> = ledger.unwrap_or_else(|| store.clone() as Arc<dyn TransactionLedger>);
        let handler = HandleAppStoreNotificationHandler::new(
            Arc::new(NotificationAuthenticator::new(
                CertificateChainVerifier::new(pki.root_certificate()),
                ClaimVerifier::new(vec![Algorithm::ES256], true),
            )),
            SubscriptionStateMachine::new(ProductCatalog::new("premium.monthly")),
            store,
            ledger,
            Arc::new(RecordingBillingNotifier::new()),
        );
        webhook_router().with_state(WebhookAppState::new(Arc::new(handler)))
    }

    fn app(pki: &TestPki) -> Router {
        app_with_ledger(pki, None)
    }

    fn post_json(body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/webhooks/app-store")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    fn notification_body(pki: &TestPki, uuid: &str) -> String {
        let signed = pki.signed_payload(
            "SUBSCRIBED",
            None,
            uuid,
            transaction_claims("X1", "X1", "premium.yearly"),
            renewal_claims(1),
        );
        json!({ "signedPayload": signed }).to_string()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    // ───────────────────────────────────────────────────────────────
    // Tests
    // ───────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn health_returns_ok() {
        let pki = TestPki::generate();

        let response = app(&pki)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn valid_notification_returns_ok_with_outcome() {
        let pki = TestPki::generate();

        let response = app(&pki)
            .oneshot(post_json(notification_body(&pki, "N1")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["notification_uuid"], "N1");
        assert_eq!(body["outcome"], "applied");
    }

    #[tokio::test]
    async fn replayed_notification_returns_ok() {
        let pki = TestPki::generate();
        let app = app(&pki);

        app.clone()
            .oneshot(post_json(notification_body(&pki, "N1")))
            .await
            .unwrap();
        let response = app
            .oneshot(post_json(notification_body(&pki, "N1")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["outcome"], "already_processed");
    }

    #[tokio::test]
    async fn untrusted_notification_is_forbidden() {
        let trusted = TestPki::generate();
        let attacker = TestPki::generate();

        let response = app(&trusted)
            .oneshot(post_json(notification_body(&attacker, "N1")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            json_body(response).await["error_code"],
            "UNTRUSTED_CERTIFICATE_CHAIN"
        );
    }

    #[tokio::test]
    async fn body_without_signed_payload_is_forbidden() {
        let pki = TestPki::generate();

        let response = app(&pki)
            .oneshot(post_json(r#"{"payload":"x"}"#.to_string()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(response).await["error_code"], "MALFORMED_PAYLOAD");
    }

    #[tokio::test]
    async fn storage_failure_is_internal_error() {
        let pki = TestPki::generate();

        let response = app_with_ledger(&pki, Some(Arc::new(UnavailableLedger)))
            .oneshot(post_json(notification_body(&pki, "N1")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["message"], "Internal error");
    }
}
