//! User directory: latest users and public user profiles.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use sqlx::{PgPool, Row};
use tracing::{error, info_span, Instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{
    message, not_found,
    posts::{post_from_row, PostResponse},
    store_unavailable, LATEST_LIMIT,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct UserSummary {
    pub id: String,
    pub name: Option<String>,
    pub image_url: Option<String>,
    pub created_at: String,
    pub post_count: i64,
}

/// Public view of a user. The email address is not exposed.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserDetail {
    pub id: String,
    pub name: Option<String>,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub created_at: String,
    pub posts: Vec<PostResponse>,
}

#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "Latest users, newest first.", body = [UserSummary]),
        (status = 401, description = "Missing or invalid session."),
    ),
    tag = "users"
)]
pub async fn list_users(pool: Extension<PgPool>) -> impl IntoResponse {
    match fetch_latest_users(&pool).await {
        Ok(users) => (StatusCode::OK, Json(users)).into_response(),
        Err(err) => {
            error!("Failed to list users: {err}");
            store_unavailable()
        }
    }
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User profile with posts.", body = UserDetail),
        (status = 400, description = "Invalid user id."),
        (status = 401, description = "Missing or invalid session."),
        (status = 404, description = "User not found."),
    ),
    tag = "users"
)]
pub async fn get_user(Path(id): Path<String>, pool: Extension<PgPool>) -> impl IntoResponse {
    let Ok(user_id) = Uuid::parse_str(id.trim()) else {
        return message(StatusCode::BAD_REQUEST, "Invalid user id");
    };

    match fetch_user_detail(&pool, user_id).await {
        Ok(Some(user)) => (StatusCode::OK, Json(user)).into_response(),
        Ok(None) => not_found(),
        Err(err) => {
            error!("Failed to fetch user: {err}");
            store_unavailable()
        }
    }
}

async fn fetch_latest_users(pool: &PgPool) -> Result<Vec<UserSummary>, sqlx::Error> {
    let query = r#"
        SELECT
            u.id::text AS id,
            u.name,
            u.image_url,
            to_char(u.created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at,
            (SELECT COUNT(*) FROM posts p WHERE p.user_id = u.id) AS post_count
        FROM users u
        ORDER BY u.created_at DESC
        LIMIT $1
    "#;
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(LATEST_LIMIT)
        .fetch_all(pool)
        .instrument(span)
        .await?;
    Ok(rows
        .into_iter()
        .map(|row| UserSummary {
            id: row.get("id"),
            name: row.get("name"),
            image_url: row.get("image_url"),
            created_at: row.get("created_at"),
            post_count: row.get("post_count"),
        })
        .collect())
}

async fn fetch_user_detail(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<UserDetail>, sqlx::Error> {
    let query = r#"
        SELECT
            id::text AS id,
            name,
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
    let Some(row) = sqlx::query(query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await?
    else {
        return Ok(None);
    };

    let posts = fetch_posts_by_user(pool, user_id).await?;

    Ok(Some(UserDetail {
        id: row.get("id"),
        name: row.get("name"),
        image_url: row.get("image_url"),
        description: row.get("description"),
        created_at: row.get("created_at"),
        posts,
    }))
}

/// Posts by one user, newest first.
pub(crate) async fn fetch_posts_by_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<PostResponse>, sqlx::Error> {
    let query = r#"
        SELECT
            id::text AS id,
            user_id::text AS user_id,
            caption,
            image_url,
            to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
        FROM posts
        WHERE user_id = $1
        ORDER BY created_at DESC
    "#;
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(user_id)
        .fetch_all(pool)
        .instrument(span)
        .await?;
    Ok(rows.iter().map(post_from_row).collect())
}
