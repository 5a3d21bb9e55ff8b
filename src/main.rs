use scrap_pickup_api::{
    auth::AuthClient, config::Config, db::Database, estimator::WeightEstimator,
    handlers::AppState, routes,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the application.
///
/// Initializes logging, configuration, the database pool, the auth and AI
/// gateway clients, then serves the Axum router.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scrap_pickup_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize database connection pool
    let db = Database::new(&config.database_url).await?;
    tracing::info!("Database connection pool established");

    if config.run_migrations {
        db.migrate().await?;
    }

    let auth = AuthClient::new(
        config.auth_base_url.clone(),
        config.auth_anon_key.clone(),
        Duration::from_secs(config.auth_cache_ttl_secs),
    )?;
    tracing::info!(
        "Auth client initialized ({}s token cache)",
        config.auth_cache_ttl_secs
    );

    let estimator = match &config.ai_api_key {
        Some(key) => match WeightEstimator::new(
            config.ai_gateway_url.clone(),
            key.clone(),
            config.ai_model.clone(),
        ) {
            Ok(client) => {
                tracing::info!("✓ AI gateway client initialized: {}", config.ai_gateway_url);
                Some(client)
            }
            Err(e) => {
                tracing::error!("Failed to initialize AI gateway client: {}", e);
                None
            }
        },
        None => None,
    };

    let port = config.port;
    let app_state = Arc::new(AppState {
        db: db.pool.clone(),
        config,
        auth,
        estimator,
    });

    let app = routes::build_app(app_state, true)?;

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
