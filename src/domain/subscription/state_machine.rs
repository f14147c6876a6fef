//! Subscription state machine.
//!
//! A pure mapping from (current state, verified notification) to the new
//! state, an optional ledger entry and the side effects to perform once the
//! change is committed. Nothing here touches storage or the network.
//!
//! | Notification                         | State change                         | Ledgered    | Side effect   |
//! |--------------------------------------|--------------------------------------|-------------|---------------|
//! | SUBSCRIBED / DID_RENEW               | activate from claims                 | yes         | -             |
//! | DID_CHANGE_RENEWAL_STATUS            | `is_renewable` only                  | no          | -             |
//! | DID_FAIL_TO_RENEW (no subtype)       | deactivate                           | no          | billing email |
//! | EXPIRED                              | deactivate                           | yes         | -             |
//! | GRACE_PERIOD_EXPIRED                 | deactivate                           | no          | billing email |
//! | REFUND of the current subscription   | deactivate                           | yes         | -             |
//! | REFUND of anything else              | -                                    | yes         | -             |
//! | everything else                      | -                                    | no          | -             |

use crate::domain::foundation::{Timestamp, UserId};

use super::notification::{NotificationType, VerifiedNotification};
use super::side_effect::SideEffect;
use super::state::{Platform, ProductCatalog, SubscriptionState};
use super::transaction::{LedgeredType, TransactionRecord};

/// Result of applying one notification to one subscription.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transition {
    /// Replacement state, `None` when the subscription is left untouched.
    pub state: Option<SubscriptionState>,
    /// Ledger row to insert in the same unit of work as `state`.
    pub ledger_entry: Option<TransactionRecord>,
    /// Instructions to carry out after a successful commit.
    pub effects: Vec<SideEffect>,
}

impl Transition {
    pub fn noop() -> Self {
        Self::default()
    }

    /// True when there is nothing to persist and nothing to emit.
    pub fn is_noop(&self) -> bool {
        self.state.is_none() && self.ledger_entry.is_none() && self.effects.is_empty()
    }
}

/// Interprets App Store notifications against a user's subscription.
#[derive(Debug, Clone)]
pub struct SubscriptionStateMachine {
    catalog: ProductCatalog,
}

impl SubscriptionStateMachine {
    pub fn new(catalog: ProductCatalog) -> Self {
        Self { catalog }
    }

    /// Computes the transition for `notification` applied to `current`.
    pub fn transition(
        &self,
        user_id: &UserId,
        current: &SubscriptionState,
        notification: &VerifiedNotification,
    ) -> Transition {
        use NotificationType::*;

        match (notification.notification_type, notification.subtype) {
            (Subscribed, _) => self.activate(user_id, current, notification, LedgeredType::Subscribed),
            (DidRenew, _) => self.activate(user_id, current, notification, LedgeredType::DidRenew),
            (DidChangeRenewalStatus, _) => {
                let mut state = current.clone();
                state.app_store.is_renewable = notification.renewal_info.is_renewable();
                Transition {
                    state: Some(state),
                    ..Transition::noop()
                }
            }
            (DidFailToRenew, None) | (GracePeriodExpired, _) => Transition {
                state: Some(deactivated(current)),
                ledger_entry: None,
                effects: vec![SideEffect::BillingFailureEmail],
            },
            (Expired, _) => Transition {
                state: Some(deactivated(current)),
                ledger_entry: Some(ledger_entry(user_id, notification, LedgeredType::Expired)),
                effects: Vec::new(),
            },
            (Refund, _) => self.refund(user_id, current, notification),
            // Acknowledged without effect. Listed explicitly so a new variant
            // has to be classified here before it compiles.
            (DidFailToRenew, Some(_))
            | (DidChangeRenewalPref, _)
            | (RefundDeclined, _)
            | (RefundReversed, _)
            | (OfferRedeemed, _)
            | (PriceIncrease, _)
            | (ConsumptionRequest, _)
            | (RenewalExtended, _)
            | (RenewalExtension, _)
            | (Revoke, _)
            | (Test, _)
            | (ExternalPurchaseToken, _)
            | (OneTimeCharge, _)
            | (Unrecognized, _) => Transition::noop(),
        }
    }

    fn activate(
        &self,
        user_id: &UserId,
        current: &SubscriptionState,
        notification: &VerifiedNotification,
        kind: LedgeredType,
    ) -> Transition {
        let info = &notification.transaction_info;
        let start_date = Some(info.purchase_timestamp());
        let expiry_date = info.expiry_timestamp();

        let mut state = current.clone();
        state.is_premium_active = true;
        state.platform = Platform::AppStore;
        state.start_date = start_date;
        state.expiry_date = expiry_date;
        state.app_store.original_transaction_id = Some(info.original_transaction_id.clone());
        state.app_store.transaction_id = Some(info.transaction_id.clone());
        state.app_store.product_type = Some(self.catalog.product_type(&info.product_id));
        state.app_store.start_date = start_date;
        state.app_store.expiry_date = expiry_date;
        state.app_store.is_renewable = notification.renewal_info.is_renewable();

        Transition {
            state: Some(state),
            ledger_entry: Some(ledger_entry(user_id, notification, kind)),
            effects: Vec::new(),
        }
    }

    fn refund(
        &self,
        user_id: &UserId,
        current: &SubscriptionState,
        notification: &VerifiedNotification,
    ) -> Transition {
        let info = &notification.transaction_info;
        let refunded_product = self.catalog.product_type(&info.product_id);
        let refunds_current = current.app_store.original_transaction_id.as_ref()
            == Some(&info.original_transaction_id)
            && current.app_store.product_type == Some(refunded_product);

        Transition {
            state: refunds_current.then(|| deactivated(current)),
            ledger_entry: Some(ledger_entry(user_id, notification, LedgeredType::Refund)),
            effects: Vec::new(),
        }
    }
}

fn deactivated(current: &SubscriptionState) -> SubscriptionState {
    SubscriptionState {
        is_premium_active: false,
        ..current.clone()
    }
}

fn ledger_entry(
    user_id: &UserId,
    notification: &VerifiedNotification,
    kind: LedgeredType,
) -> TransactionRecord {
    TransactionRecord {
        notification_uuid: notification.notification_uuid.clone(),
        transaction_id: notification.transaction_info.transaction_id.clone(),
        original_transaction_id: notification.transaction_info.original_transaction_id.clone(),
        kind,
        user_id: user_id.clone(),
        recorded_at: Timestamp::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{NotificationUuid, TransactionId};
    use crate::domain::subscription::notification::{NotificationSubtype, RenewalInfo, TransactionInfo};
    use crate::domain::subscription::state::{AppStoreSubscription, ProductType};
    use chrono::{Duration, Utc};

    const MONTHLY: &str = "premium.monthly";
    const YEARLY: &str = "premium.yearly";

    fn machine() -> SubscriptionStateMachine {
        SubscriptionStateMachine::new(ProductCatalog::new(MONTHLY))
    }

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    fn tx(id: &str) -> TransactionId {
        TransactionId::new(id).unwrap()
    }

    fn notification(
        notification_type: NotificationType,
        subtype: Option<NotificationSubtype>,
        original_transaction_id: &str,
        product_id: &str,
    ) -> VerifiedNotification {
        let now = Utc::now();
        VerifiedNotification {
            notification_type,
            subtype,
            notification_uuid: NotificationUuid::new("N1").unwrap(),
            app_account_token: Some("token-1".to_string()),
            transaction_info: TransactionInfo {
                transaction_id: tx("X2"),
                original_transaction_id: tx(original_transaction_id),
                product_id: product_id.to_string(),
                app_account_token: Some("token-1".to_string()),
                purchase_date: now,
                expires_date: Some(now + Duration::days(365)),
            },
            renewal_info: RenewalInfo {
                auto_renew_status: Some(1),
                ..Default::default()
            },
        }
    }

    fn active_yearly(original_transaction_id: &str) -> SubscriptionState {
        SubscriptionState {
            is_premium_active: true,
            platform: Platform::AppStore,
            start_date: None,
            expiry_date: None,
            app_store: AppStoreSubscription {
                original_transaction_id: Some(tx(original_transaction_id)),
                transaction_id: Some(tx(original_transaction_id)),
                product_type: Some(ProductType::Yearly),
                start_date: None,
                expiry_date: None,
                is_renewable: true,
            },
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Activation
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn subscribed_activates_and_copies_claims() {
        let n = notification(NotificationType::Subscribed, None, "X1", YEARLY);

        let t = machine().transition(&user(), &SubscriptionState::default(), &n);

        let state = t.state.expect("state should change");
        assert!(state.is_premium_active);
        assert_eq!(state.platform, Platform::AppStore);
        assert_eq!(state.app_store.transaction_id, Some(tx("X2")));
        assert_eq!(state.app_store.original_transaction_id, Some(tx("X1")));
        assert_eq!(state.app_store.product_type, Some(ProductType::Yearly));
        assert!(state.app_store.is_renewable);
        assert_eq!(state.expiry_date, n.transaction_info.expiry_timestamp());
        assert_eq!(state.app_store.expiry_date, state.expiry_date);
        assert_eq!(state.start_date, Some(n.transaction_info.purchase_timestamp()));
        assert!(t.effects.is_empty());
    }

    #[test]
    fn subscribed_is_ledgered_under_notification_uuid() {
        let n = notification(NotificationType::Subscribed, None, "X1", YEARLY);

        let t = machine().transition(&user(), &SubscriptionState::default(), &n);

        let entry = t.ledger_entry.expect("ledger entry expected");
        assert_eq!(entry.notification_uuid.as_str(), "N1");
        assert_eq!(entry.kind, LedgeredType::Subscribed);
        assert_eq!(entry.user_id, user());
        assert_eq!(entry.original_transaction_id, tx("X1"));
    }

    #[test]
    fn did_renew_is_ledgered_as_renewal() {
        let n = notification(NotificationType::DidRenew, None, "X1", MONTHLY);

        let t = machine().transition(&user(), &active_yearly("X1"), &n);

        assert_eq!(t.ledger_entry.unwrap().kind, LedgeredType::DidRenew);
        assert_eq!(t.state.unwrap().app_store.product_type, Some(ProductType::Monthly));
    }

    #[test]
    fn activation_takes_renewable_flag_from_renewal_info() {
        let mut n = notification(NotificationType::Subscribed, None, "X1", YEARLY);
        n.renewal_info.auto_renew_status = Some(0);

        let t = machine().transition(&user(), &SubscriptionState::default(), &n);

        assert!(!t.state.unwrap().app_store.is_renewable);
    }

    // ══════════════════════════════════════════════════════════════
    // Renewal status
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn renewal_status_change_only_touches_renewable_flag() {
        let current = active_yearly("X1");
        let mut n = notification(NotificationType::DidChangeRenewalStatus, None, "OTHER", MONTHLY);
        n.renewal_info.auto_renew_status = Some(0);

        let t = machine().transition(&user(), &current, &n);

        let mut expected = current.clone();
        expected.app_store.is_renewable = false;
        assert_eq!(t.state, Some(expected));
        assert!(t.ledger_entry.is_none());
        assert!(t.effects.is_empty());
    }

    // ══════════════════════════════════════════════════════════════
    // Deactivation
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn fail_to_renew_without_subtype_deactivates_and_emails() {
        let n = notification(NotificationType::DidFailToRenew, None, "X1", YEARLY);

        let t = machine().transition(&user(), &active_yearly("X1"), &n);

        assert!(!t.state.unwrap().is_premium_active);
        assert!(t.ledger_entry.is_none());
        assert_eq!(t.effects, vec![SideEffect::BillingFailureEmail]);
    }

    #[test]
    fn fail_to_renew_with_grace_period_subtype_is_noop() {
        let n = notification(
            NotificationType::DidFailToRenew,
            Some(NotificationSubtype::GracePeriod),
            "X1",
            YEARLY,
        );

        let t = machine().transition(&user(), &active_yearly("X1"), &n);

        assert!(t.is_noop());
    }

    #[test]
    fn expired_deactivates_and_is_ledgered() {
        let n = notification(
            NotificationType::Expired,
            Some(NotificationSubtype::Voluntary),
            "X1",
            YEARLY,
        );

        let t = machine().transition(&user(), &active_yearly("X1"), &n);

        let state = t.state.unwrap();
        assert!(!state.is_premium_active);
        assert_eq!(state.app_store, active_yearly("X1").app_store);
        assert_eq!(t.ledger_entry.unwrap().kind, LedgeredType::Expired);
        assert!(t.effects.is_empty());
    }

    #[test]
    fn grace_period_expired_deactivates_and_emails() {
        let n = notification(NotificationType::GracePeriodExpired, None, "X1", YEARLY);

        let t = machine().transition(&user(), &active_yearly("X1"), &n);

        assert!(!t.state.unwrap().is_premium_active);
        assert!(t.ledger_entry.is_none());
        assert_eq!(t.effects, vec![SideEffect::BillingFailureEmail]);
    }

    // ══════════════════════════════════════════════════════════════
    // Refund
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn refund_of_current_subscription_deactivates_and_is_ledgered() {
        let n = notification(NotificationType::Refund, None, "T1", YEARLY);

        let t = machine().transition(&user(), &active_yearly("T1"), &n);

        assert!(!t.state.unwrap().is_premium_active);
        assert_eq!(t.ledger_entry.unwrap().kind, LedgeredType::Refund);
    }

    #[test]
    fn refund_of_other_transaction_is_only_ledgered() {
        let n = notification(NotificationType::Refund, None, "T2", MONTHLY);

        let t = machine().transition(&user(), &active_yearly("T1"), &n);

        assert!(t.state.is_none());
        let entry = t.ledger_entry.unwrap();
        assert_eq!(entry.kind, LedgeredType::Refund);
        assert_eq!(entry.original_transaction_id, tx("T2"));
    }

    #[test]
    fn refund_with_matching_id_but_other_product_leaves_state() {
        let n = notification(NotificationType::Refund, None, "T1", MONTHLY);

        let t = machine().transition(&user(), &active_yearly("T1"), &n);

        assert!(t.state.is_none());
        assert!(t.ledger_entry.is_some());
    }

    // ══════════════════════════════════════════════════════════════
    // Everything else
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn unhandled_types_are_noops() {
        for kind in [
            NotificationType::DidChangeRenewalPref,
            NotificationType::OfferRedeemed,
            NotificationType::RefundReversed,
            NotificationType::Test,
            NotificationType::Unrecognized,
        ] {
            let n = notification(kind, None, "X1", YEARLY);
            let t = machine().transition(&user(), &active_yearly("X1"), &n);
            assert!(t.is_noop(), "{} should be a no-op", kind);
        }
    }
}
