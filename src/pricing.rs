use crate::errors::AppError;
use crate::models::{PriceQuote, ScrapCategory};
use sqlx::{PgExecutor, PgPool};

/// Prices scrap through the `calculate_scrap_price` stored procedure.
///
/// The rate table lives in the database so prices cannot be influenced by
/// the client.
pub struct PriceService {
    pool: PgPool,
}

impl PriceService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn calculate(
        &self,
        categories: &[ScrapCategory],
        weight_kg: f64,
    ) -> Result<PriceQuote, AppError> {
        quote(&self.pool, categories, weight_kg).await
    }
}

/// Runs the pricing function on any executor, so checkout can price inside
/// its own database transaction.
pub async fn quote<'e, E>(
    executor: E,
    categories: &[ScrapCategory],
    weight_kg: f64,
) -> Result<PriceQuote, AppError>
where
    E: PgExecutor<'e>,
{
    let category_names: Vec<String> = categories.iter().map(|c| c.as_str().to_string()).collect();

    tracing::debug!(
        "Pricing {:.2} kg of {:?}",
        weight_kg,
        category_names
    );

    sqlx::query_as::<_, PriceQuote>(
        r#"
        SELECT estimated_price::numeric AS estimated_price,
               confidence_score::int4 AS confidence_score
        FROM calculate_scrap_price($1::text[]::scrap_category[], $2::float8::numeric)
        "#,
    )
    .bind(&category_names)
    .bind(weight_kg)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| AppError::InternalError("calculate_scrap_price returned no rows".to_string()))
}
