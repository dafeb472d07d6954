//! Route authorization gate.
//!
//! [`decide`] is a pure function over `(is_logged_in, path, method)`. The
//! [`authorize`] middleware resolves the session, evaluates the gate, and
//! enforces the decision before any gated handler runs.
//!
//! Guest paths are compared by exact string equality. `/login/` or `/Login`
//! are therefore protected paths; this is a known brittleness, not a bug to be
//! patched here.

use axum::{
    extract::{Extension, Request},
    http::{Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Redirect, Response},
};
use serde_json::json;
use sqlx::PgPool;
use std::{collections::HashSet, sync::Arc};
use tracing::{debug, error};

use super::handlers::auth::session::resolve_auth_state;

/// Where logged-in users land when they hit a guest page.
pub const DASHBOARD_PATH: &str = "/dashboard";

const GUEST_PATHS: [&str; 3] = ["/", "/login", "/register"];

/// Outcome of the gate for a single request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
    RedirectTo(String),
}

/// Paths reachable without a session. Built once at startup and shared by
/// reference; the set never changes while the process runs.
#[derive(Clone, Debug)]
pub struct GuestRoutes {
    paths: HashSet<String>,
    redirect_to: String,
}

impl GuestRoutes {
    #[must_use]
    pub fn new<I, S>(paths: I, redirect_to: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            redirect_to: redirect_to.into(),
        }
    }

    #[must_use]
    pub fn is_guest(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    #[must_use]
    pub fn redirect_to(&self) -> &str {
        &self.redirect_to
    }
}

impl Default for GuestRoutes {
    fn default() -> Self {
        Self::new(GUEST_PATHS, DASHBOARD_PATH)
    }
}

/// Decide whether a request may proceed.
///
/// Rule order matters: non-GET requests are gated on the session alone and
/// never consult the guest/protected split.
#[must_use]
pub fn decide(routes: &GuestRoutes, is_logged_in: bool, path: &str, method: &Method) -> Decision {
    if *method != Method::GET {
        return if is_logged_in {
            Decision::Allow
        } else {
            Decision::Deny
        };
    }

    match (routes.is_guest(path), is_logged_in) {
        (true, true) => Decision::RedirectTo(routes.redirect_to().to_string()),
        (true, false) | (false, true) => Decision::Allow,
        (false, false) => Decision::Deny,
    }
}

/// Middleware enforcing [`decide`] for every request in the gated router.
///
/// On `Allow` the resolved [`Principal`](super::handlers::auth::session::Principal)
/// is inserted into the request extensions for downstream handlers.
pub async fn authorize(
    Extension(routes): Extension<Arc<GuestRoutes>>,
    Extension(pool): Extension<PgPool>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_state = match resolve_auth_state(request.headers(), &pool).await {
        Ok(state) => state,
        Err(err) => {
            error!("Failed to resolve session: {err}");
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "message": "Something went wrong, please try again" })),
            )
                .into_response();
        }
    };

    let decision = decide(
        &routes,
        auth_state.is_logged_in(),
        request.uri().path(),
        request.method(),
    );

    debug!(
        path = request.uri().path(),
        method = %request.method(),
        logged_in = auth_state.is_logged_in(),
        ?decision,
        "gate decision"
    );

    match decision {
        Decision::Allow => {
            if let Some(principal) = auth_state.into_principal() {
                request.extensions_mut().insert(principal);
            }
            next.run(request).await
        }
        Decision::RedirectTo(target) => Redirect::to(&target).into_response(),
        Decision::Deny => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Unauthorized" })),
        )
            .into_response(),
    }
}
