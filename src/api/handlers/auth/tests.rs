//! Credential store and session tests against Postgres.

use super::credentials::{
    AuthError, CredentialStore, CredentialVerifier, NewCredential, Registration, StoreError,
};
use super::storage::{
    delete_session, insert_session, lookup_session, purge_expired_sessions, PgCredentialStore,
};
use super::utils::hash_session_token;
use crate::test_support::TestDb;
use anyhow::{anyhow, Result};
use secrecy::SecretString;
use sqlx::{PgPool, Row};
use uuid::Uuid;

const TEST_COST: u32 = 4;

fn registration(name: &str, email: &str, password: &str) -> Registration {
    Registration {
        name: name.to_string(),
        email: email.to_string(),
        password: SecretString::from(password.to_string()),
        password_confirmation: SecretString::from(password.to_string()),
    }
}

fn new_credential(email: &str) -> NewCredential {
    NewCredential {
        name: "Biscuit".to_string(),
        email: email.to_string(),
        password_hash: "$2b$04$placeholderplaceholderplaceholderplaceholderplacehol".to_string(),
    }
}

async fn session_count(pool: &PgPool, user_id: Uuid) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS count FROM sessions WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(row.get("count"))
}

#[tokio::test]
async fn register_then_login_through_postgres() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };

    let verifier = CredentialVerifier::new(PgCredentialStore::new(db.pool.clone()), TEST_COST);
    let created = verifier
        .register(registration("Biscuit", "biscuit@pawgram.dev", "woofwoof"))
        .await
        .map_err(|err| anyhow!("register failed: {err}"))?;

    let identity = verifier
        .authenticate("biscuit@pawgram.dev", &SecretString::from("woofwoof".to_string()))
        .await
        .map_err(|err| anyhow!("authenticate failed: {err}"))?;
    assert_eq!(identity.id, created.id);
    assert_eq!(identity.email, "biscuit@pawgram.dev");
    assert_eq!(identity.name.as_deref(), Some("Biscuit"));

    let wrong = verifier
        .authenticate("biscuit@pawgram.dev", &SecretString::from("meowmeow".to_string()))
        .await;
    assert_eq!(wrong, Err(AuthError::InvalidCredentials));

    let unknown = verifier
        .authenticate("nobody@pawgram.dev", &SecretString::from("woofwoof".to_string()))
        .await;
    assert_eq!(unknown, Err(AuthError::InvalidCredentials));

    let stored = sqlx::query("SELECT password_hash FROM users WHERE email = $1")
        .bind("biscuit@pawgram.dev")
        .fetch_one(&db.pool)
        .await?;
    let hash: String = stored.get("password_hash");
    assert!(hash.starts_with("$2"));
    assert_ne!(hash, "woofwoof");

    Ok(())
}

#[tokio::test]
async fn concurrent_inserts_hit_unique_constraint() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };

    let store = PgCredentialStore::new(db.pool.clone());
    let (first, second) = tokio::join!(
        store.create(new_credential("twin@pawgram.dev")),
        store.create(new_credential("twin@pawgram.dev")),
    );

    let created = [first.is_ok(), second.is_ok()];
    assert_eq!(created.iter().filter(|ok| **ok).count(), 1);
    let rejected = [first, second]
        .into_iter()
        .filter_map(Result::err)
        .collect::<Vec<_>>();
    assert_eq!(rejected.len(), 1);
    assert!(rejected
        .iter()
        .all(|err| matches!(err, StoreError::UniqueViolation)));

    Ok(())
}

#[tokio::test]
async fn duplicate_registration_maps_to_generic_error() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };

    // Both may pass the existence check; the unique constraint decides.
    let verifier = CredentialVerifier::new(PgCredentialStore::new(db.pool.clone()), TEST_COST);
    let (first, second) = tokio::join!(
        verifier.register(registration("One", "race@pawgram.dev", "woofwoof")),
        verifier.register(registration("Two", "race@pawgram.dev", "woofwoof")),
    );

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .filter_map(|outcome| outcome.as_ref().err())
        .all(|err| matches!(
            err,
            AuthError::DuplicateRegistration | AuthError::InvalidInput(_)
        )));

    let row = sqlx::query("SELECT COUNT(*) AS count FROM users WHERE email = $1")
        .bind("race@pawgram.dev")
        .fetch_one(&db.pool)
        .await?;
    assert_eq!(row.get::<i64, _>("count"), 1);

    Ok(())
}

#[tokio::test]
async fn session_round_trip_and_logout() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };

    let user = PgCredentialStore::new(db.pool.clone())
        .create(new_credential("session@pawgram.dev"))
        .await?;

    let token = insert_session(&db.pool, user.id, 60).await?;
    let token_hash = hash_session_token(&token);

    let record = lookup_session(&db.pool, &token_hash).await?;
    let record = record.ok_or_else(|| anyhow!("session should resolve"))?;
    assert_eq!(record.user_id, user.id);
    assert_eq!(record.email, "session@pawgram.dev");

    delete_session(&db.pool, &token_hash).await?;
    assert!(lookup_session(&db.pool, &token_hash).await?.is_none());

    Ok(())
}

#[tokio::test]
async fn expired_sessions_are_ignored_and_purged() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };

    let user = PgCredentialStore::new(db.pool.clone())
        .create(new_credential("stale@pawgram.dev"))
        .await?;

    let expired = insert_session(&db.pool, user.id, -60).await?;
    assert!(lookup_session(&db.pool, &hash_session_token(&expired))
        .await?
        .is_none());
    assert_eq!(session_count(&db.pool, user.id).await?, 1);

    // The next login clears the expired row.
    let fresh = insert_session(&db.pool, user.id, 60).await?;
    assert_eq!(session_count(&db.pool, user.id).await?, 1);
    assert!(lookup_session(&db.pool, &hash_session_token(&fresh))
        .await?
        .is_some());

    assert_eq!(purge_expired_sessions(&db.pool, user.id).await?, 0);

    Ok(())
}
