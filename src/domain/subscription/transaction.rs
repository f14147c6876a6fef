//! Transaction ledger entries.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{NotificationUuid, Timestamp, TransactionId, UserId, ValidationError};

/// Notification types that leave a row in the transaction ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgeredType {
    Subscribed,
    DidRenew,
    Expired,
    Refund,
}

impl LedgeredType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgeredType::Subscribed => "SUBSCRIBED",
            LedgeredType::DidRenew => "DID_RENEW",
            LedgeredType::Expired => "EXPIRED",
            LedgeredType::Refund => "REFUND",
        }
    }
}

impl fmt::Display for LedgeredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LedgeredType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUBSCRIBED" => Ok(LedgeredType::Subscribed),
            "DID_RENEW" => Ok(LedgeredType::DidRenew),
            "EXPIRED" => Ok(LedgeredType::Expired),
            "REFUND" => Ok(LedgeredType::Refund),
            other => Err(ValidationError::invalid_format(
                "type",
                format!("'{}' is not a ledgered notification type", other),
            )),
        }
    }
}

/// Immutable record of a processed notification.
///
/// Created exactly once per distinct notification UUID and never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub notification_uuid: NotificationUuid,
    pub transaction_id: TransactionId,
    pub original_transaction_id: TransactionId,
    #[serde(rename = "type")]
    pub kind: LedgeredType,
    pub user_id: UserId,
    pub recorded_at: Timestamp,
}
