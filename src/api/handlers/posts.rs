//! Posts and comments.
//!
//! All routes sit behind the gate. Ownership checks are folded into the SQL
//! (`WHERE id = $1 AND user_id = $2`), so a post owned by someone else is
//! indistinguishable from a missing one.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::{error, info_span, Instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{
    auth::Principal, message, normalize_optional, not_found, store_unavailable, LATEST_LIMIT,
};

#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
pub struct Author {
    pub id: String,
    pub name: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PostAuthor {
    pub id: String,
    pub name: Option<String>,
    pub image_url: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PostSummary {
    pub id: String,
    pub caption: String,
    pub image_url: String,
    pub created_at: String,
    pub author: Author,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CommentView {
    pub id: String,
    pub text: String,
    pub created_at: String,
    pub author: Author,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PostDetail {
    pub id: String,
    pub caption: String,
    pub image_url: String,
    pub created_at: String,
    pub author: PostAuthor,
    pub comments: Vec<CommentView>,
}

/// A post as stored, returned by create/update and in profile listings.
#[derive(Debug, Serialize, ToSchema)]
pub struct PostResponse {
    pub id: String,
    pub user_id: String,
    pub caption: String,
    pub image_url: String,
    pub created_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CommentResponse {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub text: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub caption: Option<String>,
    pub image_url: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdatePostRequest {
    pub caption: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub text: String,
}

#[utoipa::path(
    get,
    path = "/posts",
    responses(
        (status = 200, description = "Latest posts, newest first.", body = [PostSummary]),
        (status = 401, description = "Missing or invalid session."),
    ),
    tag = "posts"
)]
pub async fn list_posts(pool: Extension<PgPool>) -> impl IntoResponse {
    match fetch_latest_posts(&pool).await {
        Ok(posts) => (StatusCode::OK, Json(posts)).into_response(),
        Err(err) => {
            error!("Failed to list posts: {err}");
            store_unavailable()
        }
    }
}

#[utoipa::path(
    get,
    path = "/posts/{id}",
    params(("id" = String, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post with author and comments.", body = PostDetail),
        (status = 400, description = "Invalid post id."),
        (status = 401, description = "Missing or invalid session."),
        (status = 404, description = "Post not found."),
    ),
    tag = "posts"
)]
pub async fn get_post(Path(id): Path<String>, pool: Extension<PgPool>) -> impl IntoResponse {
    let Some(post_id) = parse_id(&id) else {
        return message(StatusCode::BAD_REQUEST, "Invalid post id");
    };

    match fetch_post_detail(&pool, post_id).await {
        Ok(Some(post)) => (StatusCode::OK, Json(post)).into_response(),
        Ok(None) => not_found(),
        Err(err) => {
            error!("Failed to fetch post: {err}");
            store_unavailable()
        }
    }
}

#[utoipa::path(
    post,
    path = "/posts",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Post created.", body = PostResponse),
        (status = 400, description = "Missing image URL."),
        (status = 401, description = "Missing or invalid session."),
    ),
    tag = "posts"
)]
pub async fn create_post(
    Extension(principal): Extension<Principal>,
    pool: Extension<PgPool>,
    payload: Option<Json<CreatePostRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return message(StatusCode::BAD_REQUEST, "Missing payload");
    };

    let Some(image_url) = normalize_optional(Some(request.image_url)) else {
        return message(StatusCode::BAD_REQUEST, "Image is required");
    };
    // An empty caption is allowed.
    let caption = request.caption.unwrap_or_default();

    match insert_post(&pool, principal.user_id, &caption, &image_url).await {
        Ok(post) => (StatusCode::CREATED, Json(post)).into_response(),
        Err(err) => {
            error!("Failed to create post: {err}");
            store_unavailable()
        }
    }
}

#[utoipa::path(
    patch,
    path = "/posts/{id}",
    params(("id" = String, Path, description = "Post id")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Caption updated.", body = PostResponse),
        (status = 400, description = "Empty caption or invalid post id."),
        (status = 401, description = "Missing or invalid session."),
        (status = 404, description = "Post not found or not owned by the caller."),
    ),
    tag = "posts"
)]
pub async fn update_post(
    Path(id): Path<String>,
    Extension(principal): Extension<Principal>,
    pool: Extension<PgPool>,
    payload: Option<Json<UpdatePostRequest>>,
) -> impl IntoResponse {
    let Some(post_id) = parse_id(&id) else {
        return message(StatusCode::BAD_REQUEST, "Invalid post id");
    };
    let Some(Json(request)) = payload else {
        return message(StatusCode::BAD_REQUEST, "Missing payload");
    };
    if request.caption.trim().is_empty() {
        return message(StatusCode::BAD_REQUEST, "Caption is required");
    }

    match update_caption(&pool, post_id, principal.user_id, &request.caption).await {
        Ok(Some(post)) => (StatusCode::OK, Json(post)).into_response(),
        Ok(None) => not_found(),
        Err(err) => {
            error!("Failed to update post: {err}");
            store_unavailable()
        }
    }
}

#[utoipa::path(
    delete,
    path = "/posts/{id}",
    params(("id" = String, Path, description = "Post id")),
    responses(
        (status = 204, description = "Post deleted."),
        (status = 400, description = "Invalid post id."),
        (status = 401, description = "Missing or invalid session."),
        (status = 404, description = "Post not found or not owned by the caller."),
    ),
    tag = "posts"
)]
pub async fn delete_post(
    Path(id): Path<String>,
    Extension(principal): Extension<Principal>,
    pool: Extension<PgPool>,
) -> impl IntoResponse {
    let Some(post_id) = parse_id(&id) else {
        return message(StatusCode::BAD_REQUEST, "Invalid post id");
    };

    match delete_own_post(&pool, post_id, principal.user_id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => not_found(),
        Err(err) => {
            error!("Failed to delete post: {err}");
            store_unavailable()
        }
    }
}

#[utoipa::path(
    post,
    path = "/posts/{id}/comments",
    params(("id" = String, Path, description = "Post id")),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment created.", body = CommentResponse),
        (status = 400, description = "Empty text or invalid post id."),
        (status = 401, description = "Missing or invalid session."),
        (status = 404, description = "Post not found."),
    ),
    tag = "posts"
)]
pub async fn create_comment(
    Path(id): Path<String>,
    Extension(principal): Extension<Principal>,
    pool: Extension<PgPool>,
    payload: Option<Json<CreateCommentRequest>>,
) -> impl IntoResponse {
    let Some(post_id) = parse_id(&id) else {
        return message(StatusCode::BAD_REQUEST, "Invalid post id");
    };
    let Some(Json(request)) = payload else {
        return message(StatusCode::BAD_REQUEST, "Missing payload");
    };
    if request.text.trim().is_empty() {
        return message(StatusCode::BAD_REQUEST, "Comment text is required");
    }

    match insert_comment(&pool, post_id, principal.user_id, &request.text).await {
        Ok(Some(comment)) => (StatusCode::CREATED, Json(comment)).into_response(),
        Ok(None) => not_found(),
        Err(err) => {
            error!("Failed to create comment: {err}");
            store_unavailable()
        }
    }
}

fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}

fn author_from_row(row: &PgRow) -> Author {
    Author {
        id: row.get("author_id"),
        name: row.get("author_name"),
        image_url: row.get("author_image_url"),
    }
}

pub(crate) fn post_from_row(row: &PgRow) -> PostResponse {
    PostResponse {
        id: row.get("id"),
        user_id: row.get("user_id"),
        caption: row.get("caption"),
        image_url: row.get("image_url"),
        created_at: row.get("created_at"),
    }
}

async fn fetch_latest_posts(pool: &PgPool) -> Result<Vec<PostSummary>, sqlx::Error> {
    let query = r#"
        SELECT
            p.id::text AS id,
            p.caption,
            p.image_url,
            to_char(p.created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at,
            u.id::text AS author_id,
            u.name AS author_name,
            u.image_url AS author_image_url
        FROM posts p
        JOIN users u ON u.id = p.user_id
        ORDER BY p.created_at DESC
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
        .iter()
        .map(|row| PostSummary {
            id: row.get("id"),
            caption: row.get("caption"),
            image_url: row.get("image_url"),
            created_at: row.get("created_at"),
            author: author_from_row(row),
        })
        .collect())
}

async fn fetch_post_detail(
    pool: &PgPool,
    post_id: Uuid,
) -> Result<Option<PostDetail>, sqlx::Error> {
    let query = r#"
        SELECT
            p.id::text AS id,
            p.caption,
            p.image_url,
            to_char(p.created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at,
            u.id::text AS author_id,
            u.name AS author_name,
            u.image_url AS author_image_url,
            u.description AS author_description
        FROM posts p
        JOIN users u ON u.id = p.user_id
        WHERE p.id = $1
        LIMIT 1
    "#;
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let Some(row) = sqlx::query(query)
        .bind(post_id)
        .fetch_optional(pool)
        .instrument(span)
        .await?
    else {
        return Ok(None);
    };

    let comments = fetch_comments(pool, post_id).await?;

    Ok(Some(PostDetail {
        id: row.get("id"),
        caption: row.get("caption"),
        image_url: row.get("image_url"),
        created_at: row.get("created_at"),
        author: PostAuthor {
            id: row.get("author_id"),
            name: row.get("author_name"),
            image_url: row.get("author_image_url"),
            description: row.get("author_description"),
        },
        comments,
    }))
}

async fn fetch_comments(pool: &PgPool, post_id: Uuid) -> Result<Vec<CommentView>, sqlx::Error> {
    let query = r#"
        SELECT
            c.id::text AS id,
            c.text,
            to_char(c.created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at,
            u.id::text AS author_id,
            u.name AS author_name,
            u.image_url AS author_image_url
        FROM comments c
        JOIN users u ON u.id = c.user_id
        WHERE c.post_id = $1
        ORDER BY c.created_at ASC
    "#;
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(post_id)
        .fetch_all(pool)
        .instrument(span)
        .await?;
    Ok(rows
        .iter()
        .map(|row| CommentView {
            id: row.get("id"),
            text: row.get("text"),
            created_at: row.get("created_at"),
            author: author_from_row(row),
        })
        .collect())
}

async fn insert_post(
    pool: &PgPool,
    user_id: Uuid,
    caption: &str,
    image_url: &str,
) -> Result<PostResponse, sqlx::Error> {
    let query = r#"
        INSERT INTO posts (user_id, caption, image_url)
        VALUES ($1, $2, $3)
        RETURNING
            id::text AS id,
            user_id::text AS user_id,
            caption,
            image_url,
            to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
    "#;
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .bind(caption)
        .bind(image_url)
        .fetch_one(pool)
        .instrument(span)
        .await?;
    Ok(post_from_row(&row))
}

async fn update_caption(
    pool: &PgPool,
    post_id: Uuid,
    user_id: Uuid,
    caption: &str,
) -> Result<Option<PostResponse>, sqlx::Error> {
    let query = r#"
        UPDATE posts
        SET caption = $1
        WHERE id = $2 AND user_id = $3
        RETURNING
            id::text AS id,
            user_id::text AS user_id,
            caption,
            image_url,
            to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
    "#;
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(caption)
        .bind(post_id)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await?;
    Ok(row.as_ref().map(post_from_row))
}

async fn delete_own_post(
    pool: &PgPool,
    post_id: Uuid,
    user_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let query = "DELETE FROM posts WHERE id = $1 AND user_id = $2";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(post_id)
        .bind(user_id)
        .execute(pool)
        .instrument(span)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Insert a comment only if the post exists; `None` when it does not.
async fn insert_comment(
    pool: &PgPool,
    post_id: Uuid,
    user_id: Uuid,
    text: &str,
) -> Result<Option<CommentResponse>, sqlx::Error> {
    let query = r#"
        INSERT INTO comments (post_id, user_id, text)
        SELECT id, $2, $3 FROM posts WHERE id = $1
        RETURNING
            id::text AS id,
            post_id::text AS post_id,
            user_id::text AS user_id,
            text,
            to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
    "#;
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(post_id)
        .bind(user_id)
        .bind(text)
        .fetch_optional(pool)
        .instrument(span)
        .await?;
    Ok(row.map(|row| CommentResponse {
        id: row.get("id"),
        post_id: row.get("post_id"),
        user_id: row.get("user_id"),
        text: row.get("text"),
        created_at: row.get("created_at"),
    }))
}
