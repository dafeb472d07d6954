use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use secrecy::SecretString;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, instrument};

use super::{
    credentials::{AuthError, CredentialVerifier, Identity},
    session::session_cookie,
    state::AuthConfig,
    storage::{insert_session, PgCredentialStore},
    types::{error_response, missing_payload, ErrorResponse, LoginRequest},
};

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login success, session cookie set", body = Identity),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Invalid email or password", body = ErrorResponse),
        (status = 503, description = "Credential store unavailable", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    pool: Extension<PgPool>,
    config: Extension<Arc<AuthConfig>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return missing_payload(),
    };

    let verifier = CredentialVerifier::new(
        PgCredentialStore::new(pool.0.clone()),
        config.bcrypt_cost(),
    );
    let password = SecretString::from(request.password);
    let identity = match verifier.authenticate(&request.email, &password).await {
        Ok(identity) => identity,
        Err(err) => return error_response(err),
    };

    let token = match insert_session(&pool, identity.id, config.session_ttl_seconds()).await {
        Ok(token) => token,
        Err(err) => {
            error!("Failed to create session: {err:#}");
            return error_response(AuthError::StoreUnavailable);
        }
    };

    let mut headers = HeaderMap::new();
    match session_cookie(&config, &token) {
        Ok(cookie) => {
            headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            return error_response(AuthError::Internal);
        }
    }

    (StatusCode::OK, headers, Json(identity)).into_response()
}
