//! Subscription state owned by a user.
//!
//! Mutated only by the subscription state machine; everything else reads it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{Timestamp, TransactionId, UserId, ValidationError};

/// Store through which the premium subscription was purchased.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Platform {
    PlayStore,
    AppStore,
    #[default]
    None,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::PlayStore => "PlayStore",
            Platform::AppStore => "AppStore",
            Platform::None => "None",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PlayStore" => Ok(Platform::PlayStore),
            "AppStore" => Ok(Platform::AppStore),
            "None" => Ok(Platform::None),
            other => Err(ValidationError::invalid_format(
                "platform",
                format!("unknown platform '{}'", other),
            )),
        }
    }
}

/// Billing period of the purchased product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductType {
    Monthly,
    Yearly,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Monthly => "Monthly",
            ProductType::Yearly => "Yearly",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Monthly" => Ok(ProductType::Monthly),
            "Yearly" => Ok(ProductType::Yearly),
            other => Err(ValidationError::invalid_format(
                "product_type",
                format!("unknown product type '{}'", other),
            )),
        }
    }
}

/// Maps App Store product identifiers onto product types.
///
/// Only the monthly product is configured; every other product identifier is
/// treated as the yearly plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductCatalog {
    monthly_product_id: String,
}

impl ProductCatalog {
    pub fn new(monthly_product_id: impl Into<String>) -> Self {
        Self {
            monthly_product_id: monthly_product_id.into(),
        }
    }

    pub fn product_type(&self, product_id: &str) -> ProductType {
        if product_id == self.monthly_product_id {
            ProductType::Monthly
        } else {
            ProductType::Yearly
        }
    }
}

/// App Store specific part of the subscription.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppStoreSubscription {
    pub original_transaction_id: Option<TransactionId>,
    pub transaction_id: Option<TransactionId>,
    pub product_type: Option<ProductType>,
    pub start_date: Option<Timestamp>,
    pub expiry_date: Option<Timestamp>,
    pub is_renewable: bool,
}

/// Observable lifecycle position of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Inactive,
    ActiveRenewable,
    ActiveNonRenewable,
}

/// Premium subscription state of a single user.
///
/// `is_premium_active` reflects the last transition applied by the state
/// machine; expiry is not re-evaluated on read.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionState {
    pub is_premium_active: bool,
    pub platform: Platform,
    pub start_date: Option<Timestamp>,
    pub expiry_date: Option<Timestamp>,
    pub app_store: AppStoreSubscription,
}

impl SubscriptionState {
    pub fn status(&self) -> SubscriptionStatus {
        match (self.is_premium_active, self.app_store.is_renewable) {
            (false, _) => SubscriptionStatus::Inactive,
            (true, true) => SubscriptionStatus::ActiveRenewable,
            (true, false) => SubscriptionStatus::ActiveNonRenewable,
        }
    }
}

/// A user as seen by the billing core: identity, contact address, the token
/// linking App Store purchases to the account, and the subscription itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSubscription {
    pub user_id: UserId,
    pub email: String,
    pub app_account_token: String,
    pub state: SubscriptionState,
}
