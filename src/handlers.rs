use crate::auth::{AuthClient, AuthUser};
use crate::config::Config;
use crate::db_storage::{self, TransactionStorage};
use crate::errors::{AppError, ErrorResponse, ResultExt};
use crate::estimator::WeightEstimator;
use crate::models::*;
use crate::pricing::PriceService;
use crate::validation::{
    validate_categories, validate_image_payload, validate_transaction_request, validate_weight,
};
use axum::{
    body::Bytes,
    extract::{FromRequest, Path, Request, State},
    http::StatusCode,
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

/// Shared application state injected into handlers.
pub struct AppState {
    /// Database connection pool.
    pub db: PgPool,
    /// Application configuration.
    pub config: Config,
    /// Verifies bearer tokens against the auth provider.
    pub auth: AuthClient,
    /// AI weight estimation client; `None` when no API key is configured.
    pub estimator: Option<WeightEstimator>,
}

/// JSON request body parsed into one of the lenient request types.
///
/// Buffering and parse failures are reported as `AppError`, so an oversized
/// body yields a JSON 413 and malformed JSON a JSON 400.
pub struct JsonBody<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state).await.map_err(|rejection| {
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                AppError::PayloadTooLarge
            } else {
                AppError::BadRequest(rejection.body_text())
            }
        })?;

        serde_json::from_slice(&body)
            .map(JsonBody)
            .map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {}", e)))
    }
}

/// Fallback for known routes hit with an unsupported HTTP method.
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

/// Fallback for unknown paths.
pub async fn not_found() -> AppError {
    AppError::NotFound("Not found".to_string())
}

/// Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up")),
    tag = "Observability"
)]
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "scrap-pickup-api",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// POST /api/v1/calculate-price
///
/// Validates the selected categories and weight, then returns the price
/// computed by the database pricing function.
#[utoipa::path(
    post,
    path = "/api/v1/calculate-price",
    request_body = PriceRequest,
    responses(
        (status = 200, description = "Price estimate", body = PriceResponse),
        (status = 400, description = "Invalid categories or weight", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 405, description = "Method not allowed", body = ErrorResponse),
        (status = 500, description = "Failed to calculate price", body = ErrorResponse)
    ),
    tag = "Pricing",
    security(("bearer_auth" = []))
)]
pub async fn calculate_price(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    JsonBody(req): JsonBody<PriceRequest>,
) -> Result<Json<PriceResponse>, AppError> {
    let categories = validate_categories(req.categories.as_ref())?;
    let weight = validate_weight(req.weight.as_ref())?;

    tracing::info!(
        "POST /calculate-price - user: {}, categories: {:?}, weight: {} kg",
        user.id,
        categories,
        weight
    );

    let quote = PriceService::new(state.db.clone())
        .calculate(&categories, weight)
        .await
        .context("Failed to calculate price")?;

    Ok(Json(PriceResponse {
        estimated_price: quote.estimated_price_f64(),
        confidence_score: quote.confidence_score,
    }))
}

/// POST /api/v1/transactions
///
/// Validates a checkout, prices it server-side, assigns a transaction id
/// and records it as confirmed.
#[utoipa::path(
    post,
    path = "/api/v1/transactions",
    request_body = CreateTransactionRequest,
    responses(
        (status = 201, description = "Transaction created", body = CreateTransactionResponse),
        (status = 400, description = "Validation failure", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 500, description = "Pricing or persistence failed", body = ErrorResponse)
    ),
    tag = "Transactions",
    security(("bearer_auth" = []))
)]
pub async fn create_transaction(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    JsonBody(req): JsonBody<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<CreateTransactionResponse>), AppError> {    let checkout = validate_transaction_request(&req)?;

    tracing::info!(
        "POST /transactions - user: {}, {} categories, {} kg, {} via {}",
        user.id,
        checkout.categories.len(),
        checkout.weight_kg,
        checkout.pickup_type.as_str(),
        checkout.payment_method.as_str()
    );

    let record = TransactionStorage::new(state.db.clone())
        .create_transaction(user.id, &checkout)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateTransactionResponse {
            transaction_id: record.transaction_id,
            estimated_price: record.estimated_price,
            status: record.status,
        }),
    ))
}

/// GET /api/v1/transactions
///
/// Lists the caller's transactions, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/transactions",
    responses(
        (status = 200, description = "Caller's transactions", body = [TransactionRecord]),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    tag = "Transactions",
    security(("bearer_auth" = []))
)]
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<TransactionRecord>>, AppError> {
    let records = TransactionStorage::new(state.db.clone())
        .list_for_user(user.id)
        .await?;

    tracing::debug!("GET /transactions - user: {}, {} rows", user.id, records.len());
    Ok(Json(records))
}

/// GET /api/v1/transactions/:transaction_id
#[utoipa::path(
    get,
    path = "/api/v1/transactions/{transaction_id}",
    params(("transaction_id" = String, Path, description = "Identifier such as TXN-20261019-9F3A0C1B")),
    responses(
        (status = 200, description = "The transaction", body = TransactionRecord),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Not found or owned by someone else", body = ErrorResponse)
    ),
    tag = "Transactions",
    security(("bearer_auth" = []))
)]
pub async fn get_transaction(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(transaction_id): Path<String>,
) -> Result<Json<TransactionRecord>, AppError> {
    TransactionStorage::new(state.db.clone())
        .find_for_user(user.id, &transaction_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Transaction not found".to_string()))
}

/// POST /api/v1/estimate-weight
///
/// Sends an uploaded photo to the AI gateway and returns the estimated
/// weight, category and confidence.
#[utoipa::path(
    post,
    path = "/api/v1/estimate-weight",
    request_body = EstimateWeightRequest,
    responses(
        (status = 200, description = "Estimate", body = WeightEstimate),
        (status = 400, description = "Missing or invalid image", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 402, description = "AI credits exhausted", body = ErrorResponse),
        (status = 429, description = "AI rate limit exceeded", body = ErrorResponse),
        (status = 500, description = "AI analysis failed", body = ErrorResponse)
    ),
    tag = "Estimation",
    security(("bearer_auth" = []))
)]
pub async fn estimate_weight(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    JsonBody(req): JsonBody<EstimateWeightRequest>,
) -> Result<Json<WeightEstimate>, AppError> {    let image = validate_image_payload(req.image_base64.as_ref())?;

    let estimator = state
        .estimator
        .as_ref()
        .ok_or_else(|| AppError::InternalError("AI_API_KEY is not set".to_string()))
        .context("AI service not configured")?;

    tracing::info!(
        "POST /estimate-weight - user: {}, image: {} bytes",
        user.id,
        image.len()
    );

    let estimate = estimator
        .estimate(&image)
        .await
        .context("AI analysis failed")?;

    Ok(Json(estimate))
}

/// GET /api/v1/profile
#[utoipa::path(
    get,
    path = "/api/v1/profile",
    responses(
        (status = 200, description = "Caller's profile", body = Profile),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "No profile yet", body = ErrorResponse)
    ),
    tag = "Profile",
    security(("bearer_auth" = []))
)]
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<Profile>, AppError> {
    db_storage::find_profile(&state.db, user.id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))
}
