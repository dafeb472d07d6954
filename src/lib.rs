//! # Pawgram (photo sharing service)
//!
//! `pawgram` is a session-authenticated, multi-user photo sharing API. Users
//! register, log in, publish image posts, comment on posts, browse the latest
//! posts and users, and maintain their own profile.
//!
//! ## Authorization Gate
//!
//! Every request outside `/api/auth/*`, `/health` and the API docs passes
//! through a pure decision function evaluated on `(is_logged_in, path, method)`:
//!
//! - **Non-GET requests** are allowed only with an active session.
//! - **Guest pages** (`/`, `/login`, `/register`) are open to anonymous users and
//!   redirect logged-in users to `/dashboard`.
//! - **Everything else** requires an active session.
//!
//! Guest paths are matched by exact string equality; `/login/` is not `/login`.
//!
//! ## Credentials
//!
//! Passwords are stored as bcrypt hashes with a configurable cost (default 10).
//! Unknown emails, accounts without a password and wrong passwords all produce
//! the same rejection to prevent account enumeration.
//!
//! ## Sessions
//!
//! A successful login issues a random session token delivered as an `HttpOnly`
//! cookie. Only the SHA-256 hash of the token is stored.

pub mod api;
pub mod cli;

#[cfg(test)]
pub(crate) mod test_support;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }
}
