use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use secrecy::SecretString;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::instrument;

use super::{
    credentials::{CredentialVerifier, Identity, Registration},
    state::AuthConfig,
    storage::PgCredentialStore,
    types::{error_response, missing_payload, ErrorResponse, RegisterRequest},
};

/// Create an account. The caller still has to log in afterwards.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = Identity),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 409, description = "Registration failed", body = ErrorResponse),
        (status = 503, description = "Credential store unavailable", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn register(
    pool: Extension<PgPool>,
    config: Extension<Arc<AuthConfig>>,
    payload: Option<Json<RegisterRequest>>,
) -> impl IntoResponse {
    let request: RegisterRequest = match payload {
        Some(Json(payload)) => payload,
        None => return missing_payload(),
    };

    let registration = Registration {
        name: request.name,
        email: request.email,
        password: SecretString::from(request.password),
        password_confirmation: SecretString::from(request.password_confirmation),
    };

    let verifier = CredentialVerifier::new(
        PgCredentialStore::new(pool.0.clone()),
        config.bcrypt_cost(),
    );
    match verifier.register(registration).await {
        Ok(identity) => (StatusCode::CREATED, Json(identity)).into_response(),
        Err(err) => error_response(err),
    }
}
