//! Self-service endpoints for the logged-in user.
//!
//! Flow Overview:
//! 1) The gate has already resolved the session into a [`Principal`].
//! 2) Load the caller's row by id.
//! 3) Apply the allow-listed profile updates.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use tracing::{error, info_span, Instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{
    auth::Principal, message, normalize_optional, not_found, posts::PostResponse,
    store_unavailable, users::fetch_posts_by_user,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardResponse {
    pub profile: ProfileResponse,
    pub posts: Vec<PostResponse>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ProfileUpdateRequest {
    pub name: String,
    /// Omit to keep the current description.
    #[serde(default)]
    pub description: Option<String>,
    /// Omit to keep the current image.
    #[serde(default)]
    pub image_url: Option<String>,
}

#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (status = 200, description = "Own profile and posts, newest first.",
            body = DashboardResponse),
        (status = 401, description = "Missing or invalid session."),
    ),
    tag = "profile"
)]
pub async fn dashboard(
    Extension(principal): Extension<Principal>,
    pool: Extension<PgPool>,
) -> impl IntoResponse {
    let profile = match fetch_profile(&pool, principal.user_id).await {
        Ok(Some(profile)) => profile,
        Ok(None) => return not_found(),
        Err(err) => {
            error!("Failed to fetch dashboard profile: {err}");
            return store_unavailable();
        }
    };

    match fetch_posts_by_user(&pool, principal.user_id).await {
        Ok(posts) => (StatusCode::OK, Json(DashboardResponse { profile, posts })).into_response(),
        Err(err) => {
            error!("Failed to fetch dashboard posts: {err}");
            store_unavailable()
        }
    }
}

#[utoipa::path(
    get,
    path = "/profile",
    responses(
        (status = 200, description = "Authenticated user profile.", body = ProfileResponse),
        (status = 401, description = "Missing or invalid session."),
    ),
    tag = "profile"
)]
pub async fn get_profile(
    Extension(principal): Extension<Principal>,
    pool: Extension<PgPool>,
) -> impl IntoResponse {
    match fetch_profile(&pool, principal.user_id).await {
        Ok(Some(profile)) => (StatusCode::OK, Json(profile)).into_response(),
        Ok(None) => not_found(),
        Err(err) => {
            error!("Failed to fetch profile: {err}");
            store_unavailable()
        }
    }
}

#[utoipa::path(
    patch,
    path = "/profile",
    request_body = ProfileUpdateRequest,
    responses(
        (status = 200, description = "Profile updated.", body = ProfileResponse),
        (status = 400, description = "Invalid update payload."),
        (status = 401, description = "Missing or invalid session."),
    ),
    tag = "profile"
)]
pub async fn update_profile(
    Extension(principal): Extension<Principal>,
    pool: Extension<PgPool>,
    payload: Option<Json<ProfileUpdateRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return message(StatusCode::BAD_REQUEST, "Missing payload");
    };

    let name = request.name.trim();
    if name.is_empty() {
        return message(StatusCode::BAD_REQUEST, "Name is required");
    }
    let image_url = normalize_optional(request.image_url);

    match store_profile(&pool, principal.user_id, name, request.description, image_url).await {
        Ok(Some(profile)) => (StatusCode::OK, Json(profile)).into_response(),
        Ok(None) => not_found(),
        Err(err) => {
            error!("Failed to update profile: {err}");
            store_unavailable()
        }
    }
}

fn profile_from_row(row: &sqlx::postgres::PgRow) -> ProfileResponse {
    ProfileResponse {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        image_url: row.get("image_url"),
        description: row.get("description"),
        created_at: row.get("created_at"),
    }
}

async fn fetch_profile(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<ProfileResponse>, sqlx::Error> {
    let query = r#"
        SELECT
            id::text AS id,
            name,
            email,
            image_url,
            description,
            to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
        FROM users
        WHERE id = $1
        LIMIT 1
    "#;
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await?;
    Ok(row.as_ref().map(profile_from_row))
}

async fn store_profile(
    pool: &PgPool,
    user_id: Uuid,
    name: &str,
    description: Option<String>,
    image_url: Option<String>,
) -> Result<Option<ProfileResponse>, sqlx::Error> {
    let query = r#"
        UPDATE users
        SET
            name = $1,
            description = COALESCE($2, description),
            image_url = COALESCE($3, image_url)
        WHERE id = $4
        RETURNING
            id::text AS id,
            name,
            email,
            image_url,
            description,
            to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
    "#;
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(name)
        .bind(description)
        .bind(image_url)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await?;
    Ok(row.as_ref().map(profile_from_row))
}
