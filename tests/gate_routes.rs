use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use pawgram::api::{app, AuthConfig, GuestRoutes, SESSION_COOKIE_NAME};
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tower::ServiceExt;

// Nothing listens on port 1, so any request that reaches the database fails fast.
fn router() -> Result<Router> {
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(200))
        .connect_lazy("postgres://pawgram@127.0.0.1:1/pawgram")?;
    let config = AuthConfig::new("http://localhost:3000".to_string());
    app(pool, config, GuestRoutes::default())
}

async fn send(method: Method, uri: &str) -> Result<(StatusCode, serde_json::Value)> {
    let request = Request::builder().method(method).uri(uri).body(Body::empty())?;
    let response = router()?.oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, body))
}

#[tokio::test]
async fn anonymous_can_open_guest_pages() -> Result<()> {
    for path in ["/", "/login", "/register"] {
        let (status, body) = send(Method::GET, path).await?;
        assert_eq!(status, StatusCode::OK, "GET {path}");
        assert!(body.get("page").is_some(), "GET {path} returns a page descriptor");
    }
    Ok(())
}

#[tokio::test]
async fn anonymous_is_denied_protected_pages() -> Result<()> {
    for path in ["/dashboard", "/posts", "/users", "/profile"] {
        let (status, body) = send(Method::GET, path).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "GET {path}");
        assert_eq!(body["message"], "Unauthorized");
    }
    Ok(())
}

#[tokio::test]
async fn anonymous_mutations_are_denied() -> Result<()> {
    let (status, _) = send(Method::POST, "/posts").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // guest paths do not exempt non-GET requests
    let (status, _) = send(Method::POST, "/login").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(Method::DELETE, "/posts/not-a-uuid").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn unknown_paths_are_gated() -> Result<()> {
    let (status, _) = send(Method::GET, "/nope").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn session_lookup_failure_is_unavailable() -> Result<()> {
    let request = Request::builder()
        .uri("/dashboard")
        .header(header::COOKIE, format!("{SESSION_COOKIE_NAME}=stale-token"))
        .body(Body::empty())?;
    let response = router()?.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    Ok(())
}

#[tokio::test]
async fn auth_endpoints_bypass_the_gate() -> Result<()> {
    let (status, _) = send(Method::POST, "/api/auth/login").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(Method::POST, "/api/auth/register").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/logout")
        .body(Body::empty())?;
    let response = router()?.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    assert!(cookie.starts_with(&format!("{SESSION_COOKIE_NAME}=")));
    assert!(cookie.contains("Max-Age=0"));
    Ok(())
}

#[tokio::test]
async fn responses_carry_request_id() -> Result<()> {
    let request = Request::builder().uri("/login").body(Body::empty())?;
    let response = router()?.oneshot(request).await?;
    assert!(response.headers().contains_key("x-request-id"));
    Ok(())
}

#[tokio::test]
async fn openapi_document_is_served() -> Result<()> {
    let (status, body) = send(Method::GET, "/api-docs/openapi.json").await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"].get("/api/auth/login").is_some());
    Ok(())
}
