use crate::errors::AppError;
use crate::handlers::AppState;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// The caller behind a verified bearer token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// Verifies user access tokens against the managed auth provider.
///
/// Successful lookups are cached for a short TTL keyed by a SHA-256 digest
/// of the token, so raw tokens never sit in memory longer than a request.
#[derive(Clone)]
pub struct AuthClient {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
    verified: Cache<String, AuthenticatedUser>,
}

impl AuthClient {
    pub fn new(base_url: String, anon_key: String, cache_ttl: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create auth client: {}", e))
            })?;

        let verified = Cache::builder()
            .time_to_live(cache_ttl)
            .max_capacity(10_000)
            .build();

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key,
            verified,
        })
    }

    /// Resolves a bearer token to its user.
    ///
    /// Any non-success answer from the provider means the token is not
    /// usable and yields `Unauthorized`.
    pub async fn verify(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        let cache_key = token_digest(token);
        if let Some(user) = self.verified.get(&cache_key).await {
            tracing::debug!("Auth cache HIT for user {}", user.id);
            return Ok(user);
        }

        let url = format!("{}/auth/v1/user", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .header("apikey", &self.anon_key)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Auth provider request failed: {}", e)))?;

        if !response.status().is_success() {
            tracing::warn!(
                "Auth provider rejected token with status {}",
                response.status()
            );
            return Err(AppError::Unauthorized("Unauthorized".to_string()));
        }

        let user: AuthenticatedUser = response.json().await.map_err(|e| {
            tracing::warn!("Auth provider returned an unexpected user payload: {}", e);
            AppError::Unauthorized("Unauthorized".to_string())
        })?;

        tracing::debug!("Verified user {}", user.id);
        self.verified.insert(cache_key, user.clone()).await;
        Ok(user)
    }
}

fn token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Pulls the token out of an `Authorization: Bearer <token>` header value.
pub fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Extractor that rejects requests without a valid bearer token.
pub struct AuthUser(pub AuthenticatedUser);

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

        let token = header_value
            .to_str()
            .ok()
            .and_then(bearer_token)
            .ok_or_else(|| AppError::Unauthorized("Unauthorized".to_string()))?;

        let user = state.auth.verify(token).await?;
        Ok(AuthUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header as header_eq, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("bearer abc"), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Bearer"), None);
    }

    #[test]
    fn test_token_digest_is_hex_sha256() {
        let digest = token_digest("token");
        assert_eq!(digest.len(), 64);
        assert_ne!(digest, token_digest("token2"));
    }

    #[tokio::test]
    async fn test_verify_caches_successful_lookups() {
        let server = MockServer::start().await;
        let user_id = Uuid::new_v4();

        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .and(header_eq("apikey", "anon"))
            .and(header_eq("authorization", "Bearer good-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": user_id,
                "email": "seller@example.com",
                "role": "authenticated"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client =
            AuthClient::new(server.uri(), "anon".to_string(), Duration::from_secs(60)).unwrap();

        let first = client.verify("good-token").await.unwrap();
        let second = client.verify("good-token").await.unwrap();
        assert_eq!(first.id, user_id);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_verify_rejects_invalid_token() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "msg": "invalid JWT"
            })))
            .mount(&server)
            .await;

        let client =
            AuthClient::new(server.uri(), "anon".to_string(), Duration::from_secs(60)).unwrap();

        match client.verify("expired").await {
            Err(AppError::Unauthorized(msg)) => assert_eq!(msg, "Unauthorized"),
            other => panic!("expected Unauthorized, got {:?}", other),
        }
    }
}
