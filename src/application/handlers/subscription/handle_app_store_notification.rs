//! HandleAppStoreNotificationHandler - Command handler for App Store server notifications.
//!
//! Flow for one `signedPayload`:
//! 1. Authenticate the envelope, chain and nested tokens
//! 2. Short-circuit if the notification UUID is already ledgered
//! 3. Resolve the owning user by account token
//! 4. Lock the subscription, run the state machine on the stored state and
//!    commit state and ledger entry atomically
//! 5. Send billing emails (best-effort)

use std::sync::Arc;

use crate::domain::foundation::NotificationUuid;
use crate::domain::subscription::{
    BillingFailureNotice, NotificationError, NotificationOutcome, SideEffect,
    SubscriptionStateMachine, UserSubscription,
};
use crate::domain::verification::NotificationAuthenticator;
use crate::ports::{BillingNotifier, LedgerError, SubscriptionRepository, TransactionLedger};

/// Command to handle one inbound notification.
#[derive(Debug, Clone)]
pub struct HandleAppStoreNotificationCommand {
    /// The `signedPayload` field of the request body.
    pub signed_payload: String,
}

/// Result of notification processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleAppStoreNotificationResult {
    pub notification_uuid: NotificationUuid,
    pub outcome: NotificationOutcome,
}

/// Handler for App Store server notifications.
pub struct HandleAppStoreNotificationHandler {
    authenticator: Arc<NotificationAuthenticator>,
    state_machine: SubscriptionStateMachine,
    subscriptions: Arc<dyn SubscriptionRepository>,
    ledger: Arc<dyn TransactionLedger>,
    notifier: Arc<dyn BillingNotifier>,
}

impl HandleAppStoreNotificationHandler {
    pub fn new(
        authenticator: Arc<NotificationAuthenticator>,
        state_machine: SubscriptionStateMachine,
        subscriptions: Arc<dyn SubscriptionRepository>,
        ledger: Arc<dyn TransactionLedger>,
        notifier: Arc<dyn BillingNotifier>,
    ) -> Self {
        Self {
            authenticator,
            state_machine,
            subscriptions,
            ledger,
            notifier,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandleAppStoreNotificationCommand,
    ) -> Result<HandleAppStoreNotificationResult, NotificationError> {
        // 1. Authenticate
        let notification = self
            .authenticator
            .authenticate(&cmd.signed_payload)
            .map_err(|e| {
                tracing::warn!(error = %e, "Rejected App Store notification");
                e
            })?;
        let notification_uuid = notification.notification_uuid.clone();
        let done = |outcome| HandleAppStoreNotificationResult {
            notification_uuid: notification_uuid.clone(),
            outcome,
        };

        // 2. Idempotency fast path
        let processed = self
            .ledger
            .has_processed(&notification_uuid)
            .await
            .map_err(|e| storage_error(&notification_uuid, e))?;
        if processed {
            tracing::info!(
                notification_uuid = %notification_uuid,
                "Notification already processed, skipping"
            );
            return Ok(done(NotificationOutcome::AlreadyProcessed));
        }

        // 3. Resolve user
        let Some(user) = self.resolve_user(notification.app_account_token.as_deref()).await? else {
            tracing::info!(
                notification_uuid = %notification_uuid,
                notification_type = %notification.notification_type,
                "No user matches the notification account token"
            );
            return Ok(done(NotificationOutcome::UnknownAccount));
        };

        // 4. Transition and commit against the locked subscription
        let state_machine = &self.state_machine;
        let decide = |current: &UserSubscription| {
            state_machine.transition(&current.user_id, &current.state, &notification)
        };
        let transition = match self.subscriptions.commit(&user.user_id, &decide).await {
            Ok(transition) => transition,
            Err(LedgerError::Conflict(_)) => {
                tracing::info!(
                    notification_uuid = %notification_uuid,
                    "Concurrent delivery already committed this notification"
                );
                return Ok(done(NotificationOutcome::AlreadyProcessed));
            }
            Err(LedgerError::Storage(e)) => return Err(storage_error(&notification_uuid, e)),
        };
        if transition.is_noop() {
            tracing::debug!(
                notification_uuid = %notification_uuid,
                notification_type = %notification.notification_type,
                "Notification has no effect"
            );
            return Ok(done(NotificationOutcome::Ignored));
        }

        tracing::info!(
            notification_uuid = %notification_uuid,
            notification_type = %notification.notification_type,
            user_id = %user.user_id,
            "Applied App Store notification"
        );

        // 5. Side effects
        for effect in &transition.effects {
            self.perform(effect, &user).await;
        }

        Ok(done(NotificationOutcome::Applied))
    }

    async fn resolve_user(
        &self,
        app_account_token: Option<&str>,
    ) -> Result<Option<UserSubscription>, NotificationError> {
        let Some(token) = app_account_token.filter(|t| !t.is_empty()) else {
            return Ok(None);
        };
        self.subscriptions
            .find_by_account_token(token)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to look up user by account token");
                NotificationError::Storage(e.to_string())
            })
    }

    async fn perform(&self, effect: &SideEffect, user: &UserSubscription) {
        match effect {
            SideEffect::BillingFailureEmail => {
                let notice = BillingFailureNotice::for_user(user);
                if let Err(e) = self.notifier.send_billing_failure(&notice).await {
                    tracing::warn!(
                        user_id = %user.user_id,
                        error = %e,
                        "Failed to send billing failure email"
                    );
                }
            }
        }
    }
}

fn storage_error(
    notification_uuid: &NotificationUuid,
    e: impl std::fmt::Display,
) -> NotificationError {
    tracing::error!(
        notification_uuid = %notification_uuid,
        error = %e,
        "Storage failure while processing notification"
    );
    NotificationError::Storage(e.to_string())
}
