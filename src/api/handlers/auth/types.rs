//! Request/response types for auth endpoints.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use super::credentials::{AuthError, FieldErrors};

#[derive(ToSchema, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

#[derive(ToSchema, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(alias = "passwordConfirmation")]
    pub password_confirmation: String,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"***")
            .field("password_confirmation", &"***")
            .finish()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionResponse {
    pub user_id: String,
    pub email: String,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub errors: Option<FieldErrors>,
}

impl ErrorResponse {
    pub(crate) fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
            errors: None,
        }
    }
}

pub(super) fn missing_payload() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new("Missing payload")),
    )
        .into_response()
}

/// Map an [`AuthError`] to its HTTP response.
///
/// Credential failures share one message regardless of which check failed.
pub(super) fn error_response(err: AuthError) -> Response {
    let (status, body) = match err {
        AuthError::InvalidInput(errors) => (
            StatusCode::BAD_REQUEST,
            ErrorResponse {
                message: "Invalid input".to_string(),
                errors: Some(errors),
            },
        ),
        AuthError::InvalidCredentials => (
            StatusCode::UNAUTHORIZED,
            ErrorResponse::new("Invalid email or password"),
        ),
        AuthError::DuplicateRegistration => (
            StatusCode::CONFLICT,
            ErrorResponse::new("Registration failed"),
        ),
        AuthError::StoreUnavailable | AuthError::Internal => (
            StatusCode::SERVICE_UNAVAILABLE,
            ErrorResponse::new("Something went wrong, please try again"),
        ),
    };
    (status, Json(body)).into_response()
}
