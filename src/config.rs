use serde::Deserialize;

/// Default chat-completions endpoint used for image weight estimation.
pub const DEFAULT_AI_GATEWAY_URL: &str = "https://ai.gateway.lovable.dev/v1/chat/completions";
/// Default vision model asked to estimate scrap weight.
pub const DEFAULT_AI_MODEL: &str = "google/gemini-2.5-flash";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Base URL of the managed auth provider (e.g. the project URL).
    pub auth_base_url: String,
    /// Public (anon) API key sent alongside user tokens.
    pub auth_anon_key: String,
    pub auth_cache_ttl_secs: u64,
    pub ai_api_key: Option<String>,
    pub ai_gateway_url: String,
    pub ai_model: String,
    pub max_body_bytes: usize,
    pub run_migrations: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DB_URL")
                .or_else(|_| std::env::var("DATABASE_URL"))
                .map_err(|_| {
                    anyhow::anyhow!("DB_URL or DATABASE_URL environment variable required")
                })
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("DB_URL cannot be empty");
                    }
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DB_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            auth_base_url: std::env::var("AUTH_BASE_URL")
                .or_else(|_| std::env::var("SUPABASE_URL"))
                .map_err(|_| {
                    anyhow::anyhow!("AUTH_BASE_URL or SUPABASE_URL environment variable required")
                })
                .and_then(|url| parse_http_url("AUTH_BASE_URL", &url))?,
            auth_anon_key: std::env::var("AUTH_ANON_KEY")
                .or_else(|_| std::env::var("SUPABASE_ANON_KEY"))
                .map_err(|_| {
                    anyhow::anyhow!("AUTH_ANON_KEY or SUPABASE_ANON_KEY environment variable required")
                })
                .and_then(|key| {
                    if key.trim().is_empty() {
                        anyhow::bail!("AUTH_ANON_KEY cannot be empty");
                    }
                    Ok(key)
                })?,
            auth_cache_ttl_secs: std::env::var("AUTH_CACHE_TTL_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("AUTH_CACHE_TTL_SECS must be a number of seconds"))?,
            ai_api_key: std::env::var("AI_API_KEY")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            ai_gateway_url: match std::env::var("AI_GATEWAY_URL") {
                Ok(url) if !url.trim().is_empty() => parse_http_url("AI_GATEWAY_URL", &url)?,
                _ => DEFAULT_AI_GATEWAY_URL.to_string(),
            },
            ai_model: std::env::var("AI_MODEL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_AI_MODEL.to_string()),
            max_body_bytes: std::env::var("MAX_BODY_BYTES")
                .unwrap_or_else(|_| (8 * 1024 * 1024).to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("MAX_BODY_BYTES must be a number of bytes"))?,
            run_migrations: std::env::var("RUN_MIGRATIONS")
                .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "yes"))
                .unwrap_or(false),
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Database host: {}", database_host(&config.database_url));
        tracing::debug!("Auth Base URL: {}", config.auth_base_url);
        if config.ai_api_key.is_none() {
            tracing::warn!("AI_API_KEY not set, weight estimation is disabled");
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}

/// Host part of a database URL, safe to log.
pub fn database_host(database_url: &str) -> String {
    url::Url::parse(database_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "<unparsable>".to_string())
}

/// Validates an http(s) URL and returns it without a trailing slash.
fn parse_http_url(name: &str, raw: &str) -> anyhow::Result<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        anyhow::bail!("{} cannot be empty", name);
    }
    let parsed =
        url::Url::parse(raw).map_err(|e| anyhow::anyhow!("{} is not a valid URL: {}", name, e))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        anyhow::bail!("{} must start with http:// or https://", name);
    }
    Ok(raw.trim_end_matches('/').to_string())
}
