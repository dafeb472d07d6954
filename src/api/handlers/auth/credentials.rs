//! Credential verification and registration.
//!
//! Flow Overview: validate the submitted fields, look the email up in the
//! [`CredentialStore`], and compare the password against the stored bcrypt
//! hash. Unknown emails, records without a usable hash and wrong passwords all
//! produce [`AuthError::InvalidCredentials`] so callers cannot test for
//! registered accounts.
//!
//! bcrypt runs on the blocking thread pool; the cost factor comes from
//! [`AuthConfig`](super::AuthConfig) and is never lowered at runtime.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::{collections::BTreeMap, fmt, future::Future};
use thiserror::Error;
use tracing::{debug, error, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use super::utils::{valid_email, valid_password_length};

pub(crate) const MSG_NAME_REQUIRED: &str = "Name is required.";
pub(crate) const MSG_EMAIL_INVALID: &str = "Email address is not valid.";
pub(crate) const MSG_EMAIL_TAKEN: &str = "This email address is already in use.";
pub(crate) const MSG_PASSWORD_TOO_SHORT: &str = "Password must be at least 8 characters.";
pub(crate) const MSG_CONFIRMATION_TOO_SHORT: &str =
    "Password confirmation must be at least 8 characters.";
pub(crate) const MSG_CONFIRMATION_MISMATCH: &str = "Password and confirmation do not match.";

/// Minimal identity returned after a successful login or registration.
#[derive(ToSchema, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
    pub image_url: Option<String>,
}

/// Stored credential row. `password_hash` is `None` for accounts created
/// without a password.
#[derive(Clone)]
pub struct CredentialRecord {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
    pub password_hash: Option<String>,
    pub image_url: Option<String>,
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password_hash", &"***")
            .field("image_url", &self.image_url)
            .finish()
    }
}

impl From<CredentialRecord> for Identity {
    fn from(record: CredentialRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            email: record.email,
            image_url: record.image_url,
        }
    }
}

/// Row to insert for a new registration.
pub struct NewCredential {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    UniqueViolation,
    #[error("credential store unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),
}

/// Read/create access to stored credentials.
pub trait CredentialStore: Send + Sync {
    fn find_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<CredentialRecord>, StoreError>> + Send;

    fn create(
        &self,
        credential: NewCredential,
    ) -> impl Future<Output = Result<CredentialRecord, StoreError>> + Send;
}

/// Field-level validation messages keyed by field name.
#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: &str) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid input")]
    InvalidInput(FieldErrors),
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("duplicate registration")]
    DuplicateRegistration,
    #[error("credential store unavailable")]
    StoreUnavailable,
    #[error("password hashing failed")]
    Internal,
}

/// Registration form as submitted.
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: SecretString,
    pub password_confirmation: SecretString,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"***")
            .field("password_confirmation", &"***")
            .finish()
    }
}

pub struct CredentialVerifier<S> {
    store: S,
    cost: u32,
}

impl<S: CredentialStore> CredentialVerifier<S> {
    #[must_use]
    pub fn new(store: S, cost: u32) -> Self {
        Self { store, cost }
    }

    /// Verify an email/password pair.
    ///
    /// # Errors
    /// `InvalidInput` for malformed fields (no lookup is performed),
    /// `InvalidCredentials` for any lookup or comparison failure and
    /// `StoreUnavailable` when the store cannot be reached.
    #[instrument(skip_all)]
    pub async fn authenticate(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Identity, AuthError> {
        let errors = validate_login(email, password.expose_secret());
        if !errors.is_empty() {
            return Err(AuthError::InvalidInput(errors));
        }

        let record = match self.store.find_by_email(email).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!("No credential record for login attempt");
                return Err(AuthError::InvalidCredentials);
            }
            Err(err) => {
                error!("Failed to lookup credential record: {err}");
                return Err(AuthError::StoreUnavailable);
            }
        };

        let Some(password_hash) = record.password_hash.clone() else {
            debug!("Credential record has no password hash");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password, password_hash).await? {
            debug!("Password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(record.into())
    }

    /// Validate and persist a new account.
    ///
    /// # Errors
    /// `InvalidInput` with per-field messages, `DuplicateRegistration` when the
    /// store rejects the insert as a duplicate, `StoreUnavailable` or
    /// `Internal` otherwise.
    #[instrument(skip_all)]
    pub async fn register(&self, registration: Registration) -> Result<Identity, AuthError> {
        // Mismatch and taken-email checks only run once the basic fields pass.
        let mut errors = validate_registration_fields(&registration);
        if !errors.is_empty() {
            return Err(AuthError::InvalidInput(errors));
        }

        if registration.password.expose_secret()
            != registration.password_confirmation.expose_secret()
        {
            errors.add("password_confirmation", MSG_CONFIRMATION_MISMATCH);
        }

        match self.store.find_by_email(&registration.email).await {
            Ok(Some(_)) => errors.add("email", MSG_EMAIL_TAKEN),
            Ok(None) => {}
            Err(err) => {
                error!("Failed to check existing registration: {err}");
                return Err(AuthError::StoreUnavailable);
            }
        }

        if !errors.is_empty() {
            return Err(AuthError::InvalidInput(errors));
        }

        let password_hash = hash_password(&registration.password, self.cost).await?;

        let credential = NewCredential {
            name: registration.name.trim().to_string(),
            email: registration.email,
            password_hash,
        };

        match self.store.create(credential).await {
            Ok(record) => Ok(record.into()),
            Err(StoreError::UniqueViolation) => {
                // Lost the race against a concurrent registration for the same email.
                debug!("Registration rejected by unique constraint");
                Err(AuthError::DuplicateRegistration)
            }
            Err(err) => {
                error!("Failed to create credential record: {err}");
                Err(AuthError::StoreUnavailable)
            }
        }
    }
}

fn validate_login(email: &str, password: &str) -> FieldErrors {
    let mut errors = FieldErrors::default();
    if !valid_email(email) {
        errors.add("email", MSG_EMAIL_INVALID);
    }
    if !valid_password_length(password) {
        errors.add("password", MSG_PASSWORD_TOO_SHORT);
    }
    errors
}

fn validate_registration_fields(registration: &Registration) -> FieldErrors {
    let mut errors = FieldErrors::default();
    if registration.name.trim().is_empty() {
        errors.add("name", MSG_NAME_REQUIRED);
    }
    if !valid_email(&registration.email) {
        errors.add("email", MSG_EMAIL_INVALID);
    }
    if !valid_password_length(registration.password.expose_secret()) {
        errors.add("password", MSG_PASSWORD_TOO_SHORT);
    }
    if !valid_password_length(registration.password_confirmation.expose_secret()) {
        errors.add("password_confirmation", MSG_CONFIRMATION_TOO_SHORT);
    }
    errors
}

/// Hash a password with bcrypt at the given cost.
///
/// # Errors
/// `AuthError::Internal` if the worker fails or the cost is out of range.
pub async fn hash_password(password: &SecretString, cost: u32) -> Result<String, AuthError> {
    let password = SecretString::from(password.expose_secret().to_string());
    let result = tokio::task::spawn_blocking(move || bcrypt::hash(password.expose_secret(), cost))
        .await
        .map_err(|err| {
            error!("Password hashing task failed: {err}");
            AuthError::Internal
        })?;

    result.map_err(|err| {
        error!("Failed to hash password: {err}");
        AuthError::Internal
    })
}

async fn verify_password(
    password: &SecretString,
    password_hash: String,
) -> Result<bool, AuthError> {
    let password = SecretString::from(password.expose_secret().to_string());
    let result = tokio::task::spawn_blocking(move || {
        bcrypt::verify(password.expose_secret(), &password_hash)
    })
    .await
    .map_err(|err| {
        error!("Password verification task failed: {err}");
        AuthError::Internal
    })?;

    match result {
        Ok(matches) => Ok(matches),
        Err(err) => {
            // A malformed stored hash is not a usable credential.
            debug!("Stored password hash is not usable: {err}");
            Ok(false)
        }
    }
}
