//! billing-sync server binary.
//!
//! Loads configuration, connects to PostgreSQL and serves the App Store
//! notification webhook.

use std::sync::Arc;

use axum::http::HeaderName;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use billing_sync::adapters::app_store::{AppStoreConnectClient, ConnectCredentials};
use billing_sync::adapters::http::{webhook_router, WebhookAppState};
use billing_sync::adapters::{
    LoggingBillingNotifier, PostgresSubscriptionStore, ResendBillingNotifier,
};
use billing_sync::application::HandleAppStoreNotificationHandler;
use billing_sync::config::{AppConfig, AppStoreConfig, EmailConfig};
use billing_sync::domain::subscription::{ProductCatalog, SubscriptionStateMachine};
use billing_sync::domain::verification::{
    CertificateChainVerifier, ClaimVerifier, NotificationAuthenticator,
};
use billing_sync::ports::{
    BillingNotifier, NotifierError, SubscriptionRepository, TransactionLedger,
};

const REQUEST_ID_HEADER: &str = "x-request-id";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config);
    tracing::info!(
        environment = ?config.server.environment,
        verify_envelope_signature = config.app_store.verify_envelope_signature,
        "billing-sync starting"
    );

    let pool = config.database.pool_options().connect(&config.database.url).await?;
    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let authenticator = Arc::new(build_authenticator(&config.app_store)?);
    let store = Arc::new(PostgresSubscriptionStore::new(pool));
    let handler = HandleAppStoreNotificationHandler::new(
        authenticator,
        SubscriptionStateMachine::new(ProductCatalog::new(
            config.app_store.monthly_product_id.clone(),
        )),
        store.clone() as Arc<dyn SubscriptionRepository>,
        store as Arc<dyn TransactionLedger>,
        build_notifier(&config.email)?,
    );

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    let app = webhook_router()
        .with_state(WebhookAppState::new(Arc::new(handler)))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(config.server.request_timeout()))
                .layer(PropagateRequestIdLayer::new(request_id)),
        );

    let listener = TcpListener::bind(config.server.socket_addr()?).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for notifications");

    if config.app_store.request_test_notification_on_startup {
        request_test_notification(&config.app_store).await;
    }

    axum::serve(listener, app).await?;
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    if config.server.environment.uses_json_logs() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn build_authenticator(
    config: &AppStoreConfig,
) -> Result<NotificationAuthenticator, Box<dyn std::error::Error>> {
    let root = config.load_root_certificate()?;
    tracing::info!(
        path = %config.root_certificate_path.display(),
        "Loaded trusted root certificate"
    );

    Ok(NotificationAuthenticator::new(
        CertificateChainVerifier::new(root),
        ClaimVerifier::new(
            config.allowed_algorithms_list()?,
            config.verify_envelope_signature,
        ),
    ))
}

fn build_notifier(config: &EmailConfig) -> Result<Arc<dyn BillingNotifier>, NotifierError> {
    match &config.resend_api_key {
        Some(key) => Ok(Arc::new(ResendBillingNotifier::new(
            key.clone(),
            config.from_header(),
            config.send_timeout(),
        )?)),
        None => {
            tracing::warn!("No Resend API key configured; billing failure emails are only logged");
            Ok(Arc::new(LoggingBillingNotifier::new()))
        }
    }
}

/// Best-effort; a failure here never stops the server.
async fn request_test_notification(config: &AppStoreConfig) {
    let (Some(key_id), Some(issuer_id), Some(bundle_id), Some(key_path)) = (
        &config.key_id,
        &config.issuer_id,
        &config.bundle_id,
        &config.private_key_path,
    ) else {
        return;
    };

    let pem = match tokio::fs::read(key_path).await {
        Ok(pem) => pem,
        Err(e) => {
            tracing::error!(path = %key_path.display(), error = %e, "Cannot read App Store Connect key");
            return;
        }
    };

    let client = match ConnectCredentials::from_pem(key_id, issuer_id, bundle_id, &pem) {
        Ok(credentials) => AppStoreConnectClient::new(credentials, &config.test_notification_url),
        Err(e) => {
            tracing::error!(error = %e, "Invalid App Store Connect credentials");
            return;
        }
    };

    if let Err(e) = client.request_test_notification().await {
        tracing::warn!(error = %e, "Test notification request failed");
    }
}
