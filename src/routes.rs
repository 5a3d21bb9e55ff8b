use crate::errors::{AppError, ErrorResponse};
use crate::handlers::{self, AppState};
use crate::models::*;
use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::Response,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorError,
    GovernorLayer,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::calculate_price,
        handlers::create_transaction,
        handlers::list_transactions,
        handlers::get_transaction,
        handlers::estimate_weight,
        handlers::get_profile,
    ),
    components(
        schemas(
            ErrorResponse,
            PriceRequest,
            PriceResponse,
            CreateTransactionRequest,
            CreateTransactionResponse,
            EstimateWeightRequest,
            WeightEstimate,
            TransactionRecord,
            Profile,
            ScrapCategory,
            PickupType,
            PaymentMethod,
            TransactionStatus,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Pricing", description = "Server-side scrap pricing"),
        (name = "Transactions", description = "Pickup checkout and receipts"),
        (name = "Estimation", description = "AI weight estimation from photos"),
        (name = "Profile", description = "Caller profile"),
        (name = "Observability", description = "Service health"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Authenticated API routes. Unsupported methods on known paths get a JSON 405.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/v1/calculate-price",
            post(handlers::calculate_price).fallback(handlers::method_not_allowed),
        )
        .route(
            "/api/v1/transactions",
            get(handlers::list_transactions)
                .post(handlers::create_transaction)
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/api/v1/transactions/:transaction_id",
            get(handlers::get_transaction).fallback(handlers::method_not_allowed),
        )
        .route(
            "/api/v1/estimate-weight",
            post(handlers::estimate_weight).fallback(handlers::method_not_allowed),
        )
        .route(
            "/api/v1/profile",
            get(handlers::get_profile).fallback(handlers::method_not_allowed),
        )
}

/// Rate limiter rejections in the API's JSON error shape.
fn rate_limit_response(error: GovernorError) -> Response<Body> {
    match error {
        GovernorError::TooManyRequests { wait_time, headers } => {
            let mut response = AppError::RateLimited(format!(
                "Too many requests. Retry in {}s",
                wait_time
            ))
            .into_response();
            if let Some(headers) = headers {
                response.headers_mut().extend(headers);
            }
            response
        }
        GovernorError::UnableToExtractKey => {
            AppError::InternalError("Unable to extract rate limit key".to_string()).into_response()
        }
        GovernorError::Other { code, msg, headers } => {
            let mut response = (
                code,
                Json(ErrorResponse {
                    error: msg.unwrap_or_else(|| "Request rejected".to_string()),
                }),
            )
                .into_response();
            if let Some(headers) = headers {
                response.headers_mut().extend(headers);
            }
            response
        }
    }
}

/// Builds the full application.
///
/// Rate limiting keys on the client IP, taken from forwarding headers or
/// the peer address, so it needs connect info when no proxy sits in front.
pub fn build_app(state: Arc<AppState>, rate_limit: bool) -> anyhow::Result<Router> {
    let mut api = api_routes().layer(DefaultBodyLimit::max(state.config.max_body_bytes));

    if rate_limit {
        // 10 requests/second per IP, burst of 20
        let governor_conf = Arc::new(
            GovernorConfigBuilder::default()
                .per_millisecond(100)
                .burst_size(20)
                .key_extractor(SmartIpKeyExtractor)
                .error_handler(rate_limit_response)
                .finish()
                .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
        );
        api = api.layer(GovernorLayer {
            config: governor_conf,
        });
    }

    // Health and docs bypass rate limiting
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api)
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    Ok(app)
}
