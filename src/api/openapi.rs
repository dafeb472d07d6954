use super::handlers::{auth, health, pages, posts, profile, users};
use utoipa::{
    openapi::{Contact, InfoBuilder, License},
    OpenApi,
};

/// Every documented route. Add new handlers to `paths(...)` so they show up
/// in `/api-docs/openapi.json` and in the `openapi` binary output.
#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        pages::home,
        pages::login,
        pages::register,
        auth::login::login,
        auth::register::register,
        auth::session::session,
        auth::session::logout,
        profile::dashboard,
        profile::get_profile,
        profile::update_profile,
        posts::list_posts,
        posts::get_post,
        posts::create_post,
        posts::update_post,
        posts::delete_post,
        posts::create_comment,
        users::list_users,
        users::get_user,
    ),
    tags(
        (name = "pawgram", description = "Photo sharing API"),
        (name = "auth", description = "Login, registration and sessions"),
        (name = "pages", description = "Guest pages"),
        (name = "posts", description = "Posts and comments"),
        (name = "users", description = "User directory"),
        (name = "profile", description = "Dashboard and own profile"),
        (name = "health", description = "Liveness and database status"),
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info = cargo_info();
    doc
}

fn cargo_info() -> utoipa::openapi::Info {
    // Use Cargo.toml metadata instead of the derive defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();
    info
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(';').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    match author.split_once('<') {
        Some((name, email)) => (non_empty(name), non_empty(email.trim_end_matches('>'))),
        None => (non_empty(author), None),
    }
}
