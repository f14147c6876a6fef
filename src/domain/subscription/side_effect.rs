//! Side-effect instructions emitted by the state machine.

use crate::domain::foundation::UserId;

use super::state::UserSubscription;

pub const BILLING_FAILURE_SUBJECT: &str = "Subscription Deactivated";

pub const BILLING_FAILURE_MESSAGE: &str = "Your subscription failed to renew. This could be an issue \
with your billing method. Please check your billing method to confirm.";

/// Work to perform after a transition has been committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    /// Tell the user their renewal failed and premium access was removed.
    BillingFailureEmail,
}

/// Email the notifier gateway sends for [`SideEffect::BillingFailureEmail`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingFailureNotice {
    pub user_id: UserId,
    pub email: String,
    pub subject: String,
    pub message: String,
}

impl BillingFailureNotice {
    pub fn for_user(user: &UserSubscription) -> Self {
        Self {
            user_id: user.user_id.clone(),
            email: user.email.clone(),
            subject: BILLING_FAILURE_SUBJECT.to_string(),
            message: BILLING_FAILURE_MESSAGE.to_string(),
        }
    }
}
