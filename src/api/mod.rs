use crate::api::handlers::{auth, health, pages, posts, profile, users};
use anyhow::{anyhow, Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    middleware,
    response::Response,
    routing::{get, post},
    Extension, Router,
};
use secrecy::{ExposeSecret, SecretString};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use url::Url;
use utoipa_swagger_ui::SwaggerUi;

pub mod gate;
pub(crate) mod handlers;
mod openapi;


pub use gate::{decide, Decision, GuestRoutes};
pub use handlers::auth::{
    hash_password, AuthConfig, AuthError, AuthState, CredentialStore, CredentialVerifier,
    FieldErrors, Identity, PgCredentialStore, Principal, Registration, DEFAULT_BCRYPT_COST,
    DEFAULT_SESSION_TTL_SECONDS, SESSION_COOKIE_NAME,
};
pub use openapi::openapi;

/// Build the application router.
///
/// Pages and feature routes are wrapped by the gate middleware. The auth
/// endpoints, `/health` and the API docs are mounted outside of it.
///
/// # Errors
/// Return error if the frontend base URL cannot be turned into a CORS origin.
pub fn app(pool: PgPool, auth_config: AuthConfig, guest_routes: GuestRoutes) -> Result<Router> {
    let frontend_origin = frontend_origin(auth_config.frontend_base_url())?;
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_origin(AllowOrigin::exact(frontend_origin))
        .allow_credentials(true);

    // Unmatched paths fall through the gate as well, so anonymous callers
    // cannot discover which protected routes exist.
    let gated = Router::new()
        .route("/", get(pages::home))
        .route("/login", get(pages::login))
        .route("/register", get(pages::register))
        .route("/dashboard", get(profile::dashboard))
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route(
            "/posts/:id",
            get(posts::get_post)
                .patch(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/posts/:id/comments", post(posts::create_comment))
        .route("/users", get(users::list_users))
        .route("/users/:id", get(users::get_user))
        .route(
            "/profile",
            get(profile::get_profile).patch(profile::update_profile),
        )
        .fallback(fallback)
        .layer(middleware::from_fn(gate::authorize));

    let open = Router::new()
        .route("/api/auth/login", post(auth::login::login))
        .route("/api/auth/register", post(auth::register::register))
        .route("/api/auth/logout", post(auth::session::logout))
        .route("/api/auth/session", get(auth::session::session))
        .route("/health", get(health::health).options(health::health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi()));

    let app = gated.merge(open).layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(cors)
            .layer(Extension(Arc::new(guest_routes)))
            .layer(Extension(Arc::new(auth_config)))
            .layer(Extension(pool)),
    );

    Ok(app)
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, dsn: SecretString, auth_config: AuthConfig) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(dsn.expose_secret())
        .await
        .context("Failed to connect to database")?;

    let app = app(pool, auth_config, GuestRoutes::default())?;

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {err}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

async fn fallback() -> Response {
    handlers::not_found()
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

fn frontend_origin(frontend_base_url: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(frontend_base_url)
        .with_context(|| format!("Invalid frontend base URL: {frontend_base_url}"))?;
    let host = parsed.host_str().ok_or_else(|| {
        anyhow!("Frontend base URL must include a valid host: {frontend_base_url}")
    })?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build frontend origin header")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frontend_origin_strips_path() -> Result<()> {
        let origin = frontend_origin("https://pawgram.dev/app/")?;
        assert_eq!(origin, "https://pawgram.dev");
        let origin = frontend_origin("http://localhost:3000")?;
        assert_eq!(origin, "http://localhost:3000");
        Ok(())
    }

    #[test]
    fn frontend_origin_rejects_invalid() {
        assert!(frontend_origin("not a url").is_err());
        assert!(frontend_origin("mailto:team@pawgram.dev").is_err());
    }

    #[tokio::test]
    async fn app_rejects_bad_frontend_url() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://pawgram@localhost:1/pawgram")?;
        let config = AuthConfig::new("::bad::".to_string());
        assert!(app(pool, config, GuestRoutes::default()).is_err());
        Ok(())
    }
}
