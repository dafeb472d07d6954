//! Guest pages.
//!
//! Rendering is left to the frontend; these endpoints describe which page is
//! shown and which API calls it can make.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Debug, PartialEq, Eq)]
pub struct PageLink {
    pub rel: String,
    pub method: String,
    pub href: String,
}

#[derive(ToSchema, Serialize, Debug, PartialEq, Eq)]
pub struct PageDescriptor {
    pub page: String,
    pub title: String,
    pub links: Vec<PageLink>,
}

fn link(rel: &str, method: &str, href: &str) -> PageLink {
    PageLink {
        rel: rel.to_string(),
        method: method.to_string(),
        href: href.to_string(),
    }
}

fn home_page() -> PageDescriptor {
    PageDescriptor {
        page: "home".to_string(),
        title: "Pawgram".to_string(),
        links: vec![
            link("login", "GET", "/login"),
            link("register", "GET", "/register"),
        ],
    }
}

fn login_page() -> PageDescriptor {
    PageDescriptor {
        page: "login".to_string(),
        title: "Log in".to_string(),
        links: vec![
            link("submit", "POST", "/api/auth/login"),
            link("register", "GET", "/register"),
        ],
    }
}

fn register_page() -> PageDescriptor {
    PageDescriptor {
        page: "register".to_string(),
        title: "Create an account".to_string(),
        links: vec![
            link("submit", "POST", "/api/auth/register"),
            link("login", "GET", "/login"),
        ],
    }
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Landing page", body = PageDescriptor),
        (status = 303, description = "Logged in; redirected to /dashboard")
    ),
    tag = "pages"
)]
pub async fn home() -> impl IntoResponse {
    (StatusCode::OK, Json(home_page()))
}

#[utoipa::path(
    get,
    path = "/login",
    responses(
        (status = 200, description = "Login page", body = PageDescriptor),
        (status = 303, description = "Logged in; redirected to /dashboard")
    ),
    tag = "pages"
)]
pub async fn login() -> impl IntoResponse {
    (StatusCode::OK, Json(login_page()))
}

#[utoipa::path(
    get,
    path = "/register",
    responses(
        (status = 200, description = "Registration page", body = PageDescriptor),
        (status = 303, description = "Logged in; redirected to /dashboard")
    ),
    tag = "pages"
)]
pub async fn register() -> impl IntoResponse {
    (StatusCode::OK, Json(register_page()))
}
