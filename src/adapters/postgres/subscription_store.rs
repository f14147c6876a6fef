//! PostgreSQL implementation of SubscriptionRepository and TransactionLedger.
//!
//! `app_store_transactions.notification_uuid` is the table's PRIMARY KEY, so
//! the store itself rejects a second row for the same notification. Inserts
//! use `ON CONFLICT DO NOTHING`; zero affected rows means another delivery
//! got there first.

use crate::domain::foundation::{
    DomainError, ErrorCode, NotificationUuid, Timestamp, TransactionId, UserId,
};
use crate::domain::subscription::{
    AppStoreSubscription, LedgeredType, Platform, ProductType, SubscriptionState,
    TransactionRecord, Transition, UserSubscription,
};
use crate::ports::{LedgerError, SubscriptionRepository, TransactionLedger};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

const SUBSCRIPTION_COLUMNS: &str = r#"
    user_id, email, app_account_token, is_premium_active, platform, start_date, expiry_date,
    app_store_original_transaction_id, app_store_transaction_id, app_store_product_type,
    app_store_start_date, app_store_expiry_date, app_store_is_renewable
"#;

/// PostgreSQL implementation of the persistence ports.
pub struct PostgresSubscriptionStore {
    pool: PgPool,
}

impl PostgresSubscriptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(
        &self,
        filter: &str,
        value: &str,
    ) -> Result<Option<UserSubscription>, DomainError> {
        let query = format!(
            "SELECT {} FROM user_subscriptions WHERE {} = $1",
            SUBSCRIPTION_COLUMNS, filter
        );
        let row: Option<SubscriptionRow> = sqlx::query_as(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to find subscription: {}", e)))?;

        row.map(UserSubscription::try_from).transpose()
    }
}

/// Database row representation of a user subscription.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    user_id: String,
    email: String,
    app_account_token: String,
    is_premium_active: bool,
    platform: String,
    start_date: Option<DateTime<Utc>>,
    expiry_date: Option<DateTime<Utc>>,
    app_store_original_transaction_id: Option<String>,
    app_store_transaction_id: Option<String>,
    app_store_product_type: Option<String>,
    app_store_start_date: Option<DateTime<Utc>>,
    app_store_expiry_date: Option<DateTime<Utc>>,
    app_store_is_renewable: bool,
}

impl TryFrom<SubscriptionRow> for UserSubscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(UserSubscription {
            user_id: UserId::new(row.user_id).map_err(invalid_column)?,
            email: row.email,
            app_account_token: row.app_account_token,
            state: SubscriptionState {
                is_premium_active: row.is_premium_active,
                platform: row.platform.parse::<Platform>().map_err(invalid_column)?,
                start_date: row.start_date.map(Timestamp::from_datetime),
                expiry_date: row.expiry_date.map(Timestamp::from_datetime),
                app_store: AppStoreSubscription {
                    original_transaction_id: row
                        .app_store_original_transaction_id
                        .map(TransactionId::new)
                        .transpose()
                        .map_err(invalid_column)?,
                    transaction_id: row
                        .app_store_transaction_id
                        .map(TransactionId::new)
                        .transpose()
                        .map_err(invalid_column)?,
                    product_type: row
                        .app_store_product_type
                        .as_deref()
                        .map(str::parse::<ProductType>)
                        .transpose()
                        .map_err(invalid_column)?,
                    start_date: row.app_store_start_date.map(Timestamp::from_datetime),
                    expiry_date: row.app_store_expiry_date.map(Timestamp::from_datetime),
                    is_renewable: row.app_store_is_renewable,
                },
            },
        })
    }
}

/// Database row representation of a ledger entry.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    notification_uuid: String,
    transaction_id: String,
    original_transaction_id: String,
    #[sqlx(rename = "type")]
    kind: String,
    user_id: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for TransactionRecord {
    type Error = DomainError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(TransactionRecord {
            notification_uuid: NotificationUuid::new(row.notification_uuid)
                .map_err(invalid_column)?,
            transaction_id: TransactionId::new(row.transaction_id).map_err(invalid_column)?,
            original_transaction_id: TransactionId::new(row.original_transaction_id)
                .map_err(invalid_column)?,
            kind: row.kind.parse::<LedgeredType>().map_err(invalid_column)?,
            user_id: UserId::new(row.user_id).map_err(invalid_column)?,
            recorded_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

fn invalid_column(e: impl std::fmt::Display) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("Invalid column value: {}", e))
}

fn datetime(ts: Option<Timestamp>) -> Option<DateTime<Utc>> {
    ts.map(|t| *t.as_datetime())
}

/// Inserts a ledger row, returning whether it was new.
async fn insert_ledger_entry(
    tx: &mut Transaction<'_, Postgres>,
    entry: &TransactionRecord,
) -> Result<bool, DomainError> {
    let result = sqlx::query(
        r#"
        INSERT INTO app_store_transactions (
            notification_uuid, transaction_id, original_transaction_id, type, user_id, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (notification_uuid) DO NOTHING
        "#,
    )
    .bind(entry.notification_uuid.as_str())
    .bind(entry.transaction_id.as_str())
    .bind(entry.original_transaction_id.as_str())
    .bind(entry.kind.as_str())
    .bind(entry.user_id.as_str())
    .bind(entry.recorded_at.as_datetime())
    .execute(&mut **tx)
    .await
    .map_err(|e| DomainError::database(format!("Failed to insert ledger entry: {}", e)))?;

    Ok(result.rows_affected() > 0)
}

async fn update_state(
    tx: &mut Transaction<'_, Postgres>,
    user_id: &UserId,
    state: &SubscriptionState,
) -> Result<(), DomainError> {
    let result = sqlx::query(
        r#"
        UPDATE user_subscriptions SET
            is_premium_active = $2,
            platform = $3,
            start_date = $4,
            expiry_date = $5,
            app_store_original_transaction_id = $6,
            app_store_transaction_id = $7,
            app_store_product_type = $8,
            app_store_start_date = $9,
            app_store_expiry_date = $10,
            app_store_is_renewable = $11,
            updated_at = NOW()
        WHERE user_id = $1
        "#,
    )
    .bind(user_id.as_str())
    .bind(state.is_premium_active)
    .bind(state.platform.as_str())
    .bind(datetime(state.start_date))
    .bind(datetime(state.expiry_date))
    .bind(state.app_store.original_transaction_id.as_ref().map(|id| id.as_str()))
    .bind(state.app_store.transaction_id.as_ref().map(|id| id.as_str()))
    .bind(state.app_store.product_type.map(|p| p.as_str()))
    .bind(datetime(state.app_store.start_date))
    .bind(datetime(state.app_store.expiry_date))
    .bind(state.app_store.is_renewable)
    .execute(&mut **tx)
    .await
    .map_err(|e| DomainError::database(format!("Failed to update subscription: {}", e)))?;

    if result.rows_affected() == 0 {
        return Err(DomainError::user_not_found(user_id));
    }
    Ok(())
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionStore {
    async fn find_by_account_token(
        &self,
        app_account_token: &str,
    ) -> Result<Option<UserSubscription>, DomainError> {
        self.find_one("app_account_token", app_account_token).await
    }

    async fn find_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Option<UserSubscription>, DomainError> {
        self.find_one("user_id", user_id.as_str()).await
    }

    async fn commit(
        &self,
        user_id: &UserId,
        decide: &(dyn for<'s> Fn(&'s UserSubscription) -> Transition + Send + Sync),
    ) -> Result<Transition, LedgerError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database(format!("Failed to start transaction: {}", e)))?;

        // Row lock held until commit; concurrent notifications for this user
        // wait here and then decide from what this one wrote.
        let query = format!(
            "SELECT {} FROM user_subscriptions WHERE user_id = $1 FOR UPDATE",
            SUBSCRIPTION_COLUMNS
        );
        let row: Option<SubscriptionRow> = sqlx::query_as(&query)
            .bind(user_id.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| DomainError::database(format!("Failed to lock subscription: {}", e)))?;
        let Some(row) = row else {
            return Err(DomainError::user_not_found(user_id).into());
        };
        let current = UserSubscription::try_from(row)?;

        let transition = decide(&current);

        if let Some(entry) = &transition.ledger_entry {
            if !insert_ledger_entry(&mut tx, entry).await? {
                tx.rollback().await.map_err(|e| {
                    DomainError::database(format!("Failed to roll back transaction: {}", e))
                })?;
                return Err(LedgerError::Conflict(entry.notification_uuid.clone()));
            }
        }

        if let Some(state) = &transition.state {
            update_state(&mut tx, user_id, state).await?;
        }

        tx.commit()
            .await
            .map_err(|e| DomainError::database(format!("Failed to commit transaction: {}", e)))?;

        Ok(transition)
    }
}

#[async_trait]
impl TransactionLedger for PostgresSubscriptionStore {
    async fn has_processed(&self, notification_uuid: &NotificationUuid) -> Result<bool, DomainError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM app_store_transactions WHERE notification_uuid = $1)",
        )
        .bind(notification_uuid.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to check ledger: {}", e)))?;

        Ok(exists)
    }

    async fn record(&self, entry: TransactionRecord) -> Result<(), LedgerError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database(format!("Failed to start transaction: {}", e)))?;

        if !insert_ledger_entry(&mut tx, &entry).await? {
            return Err(LedgerError::Conflict(entry.notification_uuid));
        }

        tx.commit()
            .await
            .map_err(|e| DomainError::database(format!("Failed to commit transaction: {}", e)))?;

        Ok(())
    }

    async fn find_by_notification_uuid(
        &self,
        notification_uuid: &NotificationUuid,
    ) -> Result<Option<TransactionRecord>, DomainError> {
        let row: Option<TransactionRow> = sqlx::query_as(
            r#"
            SELECT notification_uuid, transaction_id, original_transaction_id, type, user_id, created_at
            FROM app_store_transactions
            WHERE notification_uuid = $1
            "#,
        )
        .bind(notification_uuid.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find ledger entry: {}", e)))?;

        row.map(TransactionRecord::try_from).transpose()
    }
}
