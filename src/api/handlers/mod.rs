//! API handlers and shared response helpers for Pawgram.
//!
//! Handlers behind the gate read the current [`auth::Principal`] from the
//! request extensions; the gate only lets a protected request through when a
//! session resolved, so the extension is always present there.

pub mod auth;
pub mod health;
pub mod pages;
pub mod posts;
pub mod profile;
pub mod users;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

/// Upper bound on rows returned by the "latest" listings.
pub(crate) const LATEST_LIMIT: i64 = 100;

/// Plain `{ "message": ... }` body used for non-auth errors.
#[derive(ToSchema, Serialize, Debug)]
pub struct Message {
    pub message: String,
}

pub(crate) fn message(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(Message {
            message: message.to_string(),
        }),
    )
        .into_response()
}

pub(crate) fn not_found() -> Response {
    message(StatusCode::NOT_FOUND, "Not found")
}

/// Store failures are logged by the caller; clients get a generic body.
pub(crate) fn store_unavailable() -> Response {
    message(
        StatusCode::SERVICE_UNAVAILABLE,
        "Something went wrong, please try again",
    )
}

/// Trim and drop empty strings.
pub(crate) fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
