//! Session resolution and the session/logout endpoints.
//!
//! A session token arrives either as the `pawgram_session` cookie or as an
//! `Authorization: Bearer` header. Only its SHA-256 hash is ever compared
//! against the database.

use anyhow::Result;
use axum::{
    extract::Extension,
    http::{
        header::{InvalidHeaderValue, AUTHORIZATION, COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use super::{
    state::AuthConfig,
    storage::{delete_session, lookup_session},
    types::SessionResponse,
    utils::hash_session_token,
};

pub const SESSION_COOKIE_NAME: &str = "pawgram_session";

/// Authenticated user attached to a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
}

/// Whether a verified identity is attached to the current request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    Authenticated(Principal),
}

impl AuthState {
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    #[must_use]
    pub fn into_principal(self) -> Option<Principal> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(principal) => Some(principal),
        }
    }
}

/// Resolve request headers into an [`AuthState`].
///
/// Missing, unknown or expired tokens resolve to `Anonymous`; only a failing
/// store is an error.
pub(crate) async fn resolve_auth_state(headers: &HeaderMap, pool: &PgPool) -> Result<AuthState> {
    let Some(token) = extract_session_token(headers) else {
        return Ok(AuthState::Anonymous);
    };
    let token_hash = hash_session_token(&token);
    let state = lookup_session(pool, &token_hash)
        .await?
        .map_or(AuthState::Anonymous, |record| {
            AuthState::Authenticated(Principal {
                user_id: record.user_id,
                email: record.email,
            })
        });
    Ok(state)
}

#[utoipa::path(
    get,
    path = "/api/auth/session",
    responses(
        (status = 200, description = "Session is active", body = SessionResponse),
        (status = 204, description = "No active session")
    ),
    tag = "auth"
)]
pub async fn session(headers: HeaderMap, pool: Extension<PgPool>) -> impl IntoResponse {
    match resolve_auth_state(&headers, &pool).await {
        Ok(AuthState::Authenticated(principal)) => {
            let response = SessionResponse {
                user_id: principal.user_id.to_string(),
                email: principal.email,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Ok(AuthState::Anonymous) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            error!("Failed to lookup session: {err}");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 204, description = "Session cleared")
    ),
    tag = "auth"
)]
pub async fn logout(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    config: Extension<Arc<AuthConfig>>,
) -> impl IntoResponse {
    if let Some(token) = extract_session_token(&headers) {
        let token_hash = hash_session_token(&token);
        if let Err(err) = delete_session(&pool, &token_hash).await {
            error!("Failed to delete session: {err}");
        }
    }

    // Always clear the cookie, even if the session record was missing.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie(&config) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    (StatusCode::NO_CONTENT, response_headers).into_response()
}

/// Build an `HttpOnly` cookie for the session token.
pub(super) fn session_cookie(
    config: &AuthConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = config.session_ttl_seconds();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    // Only mark cookies secure when the frontend is served over HTTPS.
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn clear_session_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }
    let value = headers.get(COOKIE)?.to_str().ok()?;
    value.split(';').find_map(|pair| {
        let (key, val) = pair.trim().split_once('=')?;
        (key.trim() == SESSION_COOKIE_NAME && !val.trim().is_empty())
            .then(|| val.trim().to_string())
    })
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use sqlx::postgres::PgPoolOptions;

    fn headers(name: &'static str, value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn extracts_cookie_among_others() {
        let headers = headers("cookie", "theme=dark; pawgram_session=abc123; lang=ja");
        assert_eq!(extract_session_token(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn ignores_empty_or_foreign_cookies() {
        let headers1 = headers("cookie", "pawgram_session=; theme=dark");
        assert_eq!(extract_session_token(&headers1), None);
        let headers2 = headers("cookie", "other_session=abc");
        assert_eq!(extract_session_token(&headers2), None);
        assert_eq!(extract_session_token(&HeaderMap::new()), None);
    }

    #[test]
    fn bearer_takes_precedence_over_cookie() {
        let mut headers = headers("cookie", "pawgram_session=from-cookie");
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(
            extract_session_token(&headers),
            Some("from-header".to_string())
        );
    }

    #[test]
    fn bearer_rejects_other_schemes() {
        let headers1 = headers("authorization", "Basic dXNlcjpwYXNz");
        assert_eq!(extract_bearer_token(&headers1), None);
        let headers2 = headers("authorization", "Bearer   ");
        assert_eq!(extract_bearer_token(&headers2), None);
    }

    #[test]
    fn session_cookie_attributes() -> anyhow::Result<()> {
        let config =
            AuthConfig::new("http://localhost:3000".to_string()).with_session_ttl_seconds(60);
        let cookie = session_cookie(&config, "tok")?;
        let cookie = cookie.to_str()?;
        assert_eq!(
            cookie,
            "pawgram_session=tok; Path=/; HttpOnly; SameSite=Lax; Max-Age=60"
        );

        let config = AuthConfig::new("https://pawgram.dev".to_string());
        let cookie = session_cookie(&config, "tok")?;
        assert!(cookie.to_str()?.ends_with("; Secure"));

        let cleared = clear_session_cookie(&config)?;
        assert!(cleared.to_str()?.contains("Max-Age=0"));
        Ok(())
    }

    #[test]
    fn auth_state_accessors() {
        let principal = Principal {
            user_id: Uuid::nil(),
            email: "a@example.com".to_string(),
        };
        assert!(!AuthState::Anonymous.is_logged_in());
        assert_eq!(AuthState::Anonymous.into_principal(), None);

        let state = AuthState::Authenticated(principal.clone());
        assert!(state.is_logged_in());
        assert_eq!(state.into_principal(), Some(principal));
    }

    #[tokio::test]
    async fn missing_token_resolves_anonymous_without_store() -> anyhow::Result<()> {
        // A lazy pool never connects; resolving without a token must not touch it.
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://pawgram@localhost:1/pawgram")
            .context("lazy pool")?;
        let state = resolve_auth_state(&HeaderMap::new(), &pool).await?;
        assert_eq!(state, AuthState::Anonymous);
        Ok(())
    }
}
