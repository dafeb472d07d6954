//! Auth handlers and supporting modules.
//!
//! Credentials are an email plus a bcrypt-hashed password stored on the
//! `users` row. A successful login issues an opaque session token: the raw
//! value goes to the client as the `pawgram_session` cookie and only its
//! SHA-256 hash is persisted in `sessions`.
//!
//! ## Session lifetime
//!
//! Sessions expire after `AuthConfig::session_ttl_seconds` (seven days by
//! default). Expired rows are ignored on lookup and a user's expired rows are
//! purged on their next login; logout deletes the row and clears the cookie.

pub(crate) mod credentials;
pub(crate) mod login;
pub(crate) mod register;
pub(crate) mod session;
mod state;
mod storage;
pub(crate) mod types;
mod utils;

#[cfg(test)]
mod tests;

pub use credentials::{
    hash_password, AuthError, CredentialStore, CredentialVerifier, FieldErrors, Identity,
    Registration,
};
pub use session::{AuthState, Principal, SESSION_COOKIE_NAME};
pub use state::{AuthConfig, DEFAULT_BCRYPT_COST, DEFAULT_SESSION_TTL_SECONDS};
pub use storage::PgCredentialStore;
