use crate::errors::{AppError, ResultExt};
use crate::models::{
    PaymentMethod, PriceQuote, Profile, TransactionRecord, TransactionStatus, ValidatedTransaction,
};
use crate::pricing;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Column list for `TransactionRecord`, casting enums and numerics to the
/// plain Rust types the record uses.
const TRANSACTION_COLUMNS: &str = r#"
    id, user_id, transaction_id,
    categories::text[] AS categories,
    weight_kg::float8 AS weight_kg,
    location,
    estimated_price::float8 AS estimated_price,
    confidence_score, pickup_date, pickup_time, pickup_type,
    payment_method::text AS payment_method,
    status::text AS status,
    created_at, updated_at
"#;

/// Builds a transaction identifier such as `TXN-20261019-9F3A0C1B`.
///
/// The random suffix comes from a v4 UUID; the unique index on
/// `transactions.transaction_id` is the final guard against collisions.
pub fn generate_transaction_id(method: PaymentMethod, now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    format!(
        "{}-{}-{}",
        method.transaction_prefix(),
        now.format("%Y%m%d"),
        suffix
    )
}

/// Database storage for pickup transactions.
pub struct TransactionStorage {
    pool: PgPool,
}

impl TransactionStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Prices and records a checkout in a single database transaction.
    ///
    /// Nothing is written unless pricing succeeds, and a failed insert rolls
    /// back on drop, so each call creates at most one row.
    pub async fn create_transaction(
        &self,
        user_id: Uuid,
        checkout: &ValidatedTransaction,
    ) -> Result<TransactionRecord, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to create transaction")?;

        let quote: PriceQuote = pricing::quote(&mut *tx, &checkout.categories, checkout.weight_kg)
            .await
            .context("Failed to calculate price")?;

        let transaction_id = generate_transaction_id(checkout.payment_method, Utc::now());
        let category_names: Vec<String> = checkout
            .categories
            .iter()
            .map(|c| c.as_str().to_string())
            .collect();

        let record = sqlx::query_as::<_, TransactionRecord>(&format!(
            r#"
            INSERT INTO transactions (
                user_id, transaction_id, categories, weight_kg, location,
                estimated_price, confidence_score, pickup_date, pickup_time,
                pickup_type, payment_method, status
            )
            VALUES (
                $1, $2, $3::text[]::scrap_category[], $4::float8::numeric, $5,
                $6, $7, $8, $9,
                $10, $11::payment_method, $12::transaction_status
            )
            RETURNING {}
            "#,
            TRANSACTION_COLUMNS
        ))
        .bind(user_id)
        .bind(&transaction_id)
        .bind(&category_names)
        .bind(checkout.weight_kg)
        .bind(&checkout.location)
        .bind(&quote.estimated_price)
        .bind(quote.confidence_score)
        .bind(checkout.pickup_date)
        .bind(&checkout.pickup_time)
        .bind(checkout.pickup_type.as_str())
        .bind(checkout.payment_method.as_str())
        .bind(TransactionStatus::Confirmed.as_str())
        .fetch_one(&mut *tx)
        .await
        .context("Failed to create transaction")?;

        tx.commit().await.context("Failed to create transaction")?;

        tracing::info!(
            "✓ Transaction {} recorded for user {} ({:.2} kg, price {})",
            record.transaction_id,
            user_id,
            record.weight_kg,
            record.estimated_price
        );

        Ok(record)
    }

    /// All transactions owned by `user_id`, newest first.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<TransactionRecord>, AppError> {
        let records = sqlx::query_as::<_, TransactionRecord>(&format!(
            "SELECT {} FROM transactions WHERE user_id = $1 ORDER BY created_at DESC",
            TRANSACTION_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// A single transaction, only if it belongs to `user_id`.
    pub async fn find_for_user(
        &self,
        user_id: Uuid,
        transaction_id: &str,
    ) -> Result<Option<TransactionRecord>, AppError> {
        let record = sqlx::query_as::<_, TransactionRecord>(&format!(
            "SELECT {} FROM transactions WHERE user_id = $1 AND transaction_id = $2",
            TRANSACTION_COLUMNS
        ))
        .bind(user_id)
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }
}

pub async fn find_profile(pool: &PgPool, user_id: Uuid) -> Result<Option<Profile>, AppError> {
    let profile = sqlx::query_as::<_, Profile>(
        "SELECT id, user_id, display_name, avatar_url, created_at, updated_at \
         FROM profiles WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(profile)
}
