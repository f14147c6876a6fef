//! App Store Connect API adapter.

mod connect_client;

pub use connect_client::{
    AppStoreConnectClient, AppStoreConnectError, ConnectClaims, ConnectCredentials,
    TestNotificationResponse,
};
