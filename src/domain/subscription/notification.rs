//! App Store server notification vocabulary.
//!
//! Notification types and subtypes are closed enums. Values the platform adds
//! later deserialize into `Unrecognized` instead of failing the whole payload.

use chrono::serde::{ts_milliseconds, ts_milliseconds_option};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{NotificationUuid, Timestamp, TransactionId, ValidationError};

/// The in-app purchase event a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    Subscribed,
    DidRenew,
    DidChangeRenewalStatus,
    DidChangeRenewalPref,
    DidFailToRenew,
    Expired,
    GracePeriodExpired,
    Refund,
    RefundDeclined,
    RefundReversed,
    OfferRedeemed,
    PriceIncrease,
    ConsumptionRequest,
    RenewalExtended,
    RenewalExtension,
    Revoke,
    Test,
    ExternalPurchaseToken,
    OneTimeCharge,
    #[serde(other)]
    Unrecognized,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Subscribed => "SUBSCRIBED",
            NotificationType::DidRenew => "DID_RENEW",
            NotificationType::DidChangeRenewalStatus => "DID_CHANGE_RENEWAL_STATUS",
            NotificationType::DidChangeRenewalPref => "DID_CHANGE_RENEWAL_PREF",
            NotificationType::DidFailToRenew => "DID_FAIL_TO_RENEW",
            NotificationType::Expired => "EXPIRED",
            NotificationType::GracePeriodExpired => "GRACE_PERIOD_EXPIRED",
            NotificationType::Refund => "REFUND",
            NotificationType::RefundDeclined => "REFUND_DECLINED",
            NotificationType::RefundReversed => "REFUND_REVERSED",
            NotificationType::OfferRedeemed => "OFFER_REDEEMED",
            NotificationType::PriceIncrease => "PRICE_INCREASE",
            NotificationType::ConsumptionRequest => "CONSUMPTION_REQUEST",
            NotificationType::RenewalExtended => "RENEWAL_EXTENDED",
            NotificationType::RenewalExtension => "RENEWAL_EXTENSION",
            NotificationType::Revoke => "REVOKE",
            NotificationType::Test => "TEST",
            NotificationType::ExternalPurchaseToken => "EXTERNAL_PURCHASE_TOKEN",
            NotificationType::OneTimeCharge => "ONE_TIME_CHARGE",
            NotificationType::Unrecognized => "UNRECOGNIZED",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Additional detail qualifying a notification type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationSubtype {
    InitialBuy,
    Resubscribe,
    Downgrade,
    Upgrade,
    AutoRenewEnabled,
    AutoRenewDisabled,
    Voluntary,
    BillingRetry,
    PriceIncrease,
    GracePeriod,
    Pending,
    Accepted,
    BillingRecovery,
    ProductNotForSale,
    Summary,
    Failure,
    Unreported,
    #[serde(other)]
    Unrecognized,
}

/// Decoded claims of a `signedTransactionInfo` token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInfo {
    pub transaction_id: TransactionId,
    pub original_transaction_id: TransactionId,
    pub product_id: String,
    #[serde(default)]
    pub app_account_token: Option<String>,
    #[serde(with = "ts_milliseconds")]
    pub purchase_date: DateTime<Utc>,
    #[serde(default, with = "ts_milliseconds_option")]
    pub expires_date: Option<DateTime<Utc>>,
}

impl TransactionInfo {
    /// Checks the identifiers the ledger and state machine depend on.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.transaction_id.as_str().is_empty() {
            return Err(ValidationError::empty_field("transactionId"));
        }
        if self.original_transaction_id.as_str().is_empty() {
            return Err(ValidationError::empty_field("originalTransactionId"));
        }
        Ok(())
    }

    pub fn purchase_timestamp(&self) -> Timestamp {
        Timestamp::from_datetime(self.purchase_date)
    }

    pub fn expiry_timestamp(&self) -> Option<Timestamp> {
        self.expires_date.map(Timestamp::from_datetime)
    }
}

/// Decoded claims of a `signedRenewalInfo` token.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewalInfo {
    #[serde(default)]
    pub auto_renew_status: Option<i64>,
    #[serde(default)]
    pub auto_renew_product_id: Option<String>,
    #[serde(default)]
    pub original_transaction_id: Option<String>,
}

impl RenewalInfo {
    /// Only an explicit `autoRenewStatus` of 0 marks the subscription as not
    /// renewing.
    pub fn is_renewable(&self) -> bool {
        self.auto_renew_status != Some(0)
    }
}

/// A notification whose envelope, certificate chain and embedded tokens have
/// all been verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedNotification {
    pub notification_type: NotificationType,
    pub subtype: Option<NotificationSubtype>,
    pub notification_uuid: NotificationUuid,
    pub app_account_token: Option<String>,
    pub transaction_info: TransactionInfo,
    pub renewal_info: RenewalInfo,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn notification_type_parses_known_values() {
        let parsed: NotificationType = serde_json::from_value(json!("DID_FAIL_TO_RENEW")).unwrap();
        assert_eq!(parsed, NotificationType::DidFailToRenew);
        assert_eq!(parsed.to_string(), "DID_FAIL_TO_RENEW");
    }

    #[test]
    fn notification_type_falls_back_to_unrecognized() {
        let parsed: NotificationType =
            serde_json::from_value(json!("SOMETHING_NEW_FROM_APPLE")).unwrap();
        assert_eq!(parsed, NotificationType::Unrecognized);
    }

    #[test]
    fn subtype_falls_back_to_unrecognized() {
        let parsed: NotificationSubtype = serde_json::from_value(json!("BRAND_NEW")).unwrap();
        assert_eq!(parsed, NotificationSubtype::Unrecognized);
    }

    #[test]
    fn transaction_info_reads_millisecond_dates() {
        let info: TransactionInfo = serde_json::from_value(json!({
            "transactionId": "X1",
            "originalTransactionId": "X1",
            "productId": "premium.yearly",
            "appAccountToken": "token-1",
            "purchaseDate": 1_705_276_800_000_i64,
            "expiresDate": 1_736_899_200_000_i64,
            "bundleId": "com.example.app"
        }))
        .unwrap();

        assert_eq!(info.purchase_timestamp().as_unix_secs(), 1_705_276_800);
        assert_eq!(info.expiry_timestamp().unwrap().as_unix_secs(), 1_736_899_200);
        assert_eq!(info.app_account_token.as_deref(), Some("token-1"));
    }

    #[test]
    fn transaction_info_tolerates_missing_expiry() {
        let info: TransactionInfo = serde_json::from_value(json!({
            "transactionId": "X1",
            "originalTransactionId": "X1",
            "productId": "lifetime",
            "purchaseDate": 1_705_276_800_000_i64
        }))
        .unwrap();

        assert!(info.expires_date.is_none());
        assert!(info.app_account_token.is_none());
        assert!(info.validate().is_ok());
    }

    #[test]
    fn transaction_info_validate_rejects_empty_ids() {
        let info: TransactionInfo = serde_json::from_value(json!({
            "transactionId": "",
            "originalTransactionId": "X1",
            "productId": "premium.yearly",
            "purchaseDate": 1_705_276_800_000_i64
        }))
        .unwrap();

        assert!(info.validate().is_err());
    }

    #[test]
    fn renewal_info_is_renewable_unless_status_zero() {
        let off = RenewalInfo {
            auto_renew_status: Some(0),
            ..Default::default()
        };
        let on = RenewalInfo {
            auto_renew_status: Some(1),
            ..Default::default()
        };

        assert!(!off.is_renewable());
        assert!(on.is_renewable());
        assert!(RenewalInfo::default().is_renewable());
    }
}
