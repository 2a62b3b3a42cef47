use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Duration, Local};
use log::{debug, info};
use rocket::tokio::task::spawn_blocking;
use rusqlite::Connection;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{self, DbPool};

pub const SESSION_COOKIE: &str = "session";

const MAX_SESSIONS: i64 = 5;
const MIN_PASSWORD_LEN: usize = 6;

/// Identity returned by a successful sign-in or sign-up.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub user_id: i64,
    pub email: String,
}

/// Decoded claims of a verified session token.
#[derive(Debug, Clone, PartialEq)]
pub struct Claims {
    pub user_id: i64,
    pub email: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("email is already registered")]
    EmailTaken,
    #[error("enter a valid email address")]
    InvalidEmail,
    #[error("password must be at least 6 characters")]
    WeakPassword,
    #[error("invalid email or password")]
    BadCredentials,
    #[error("current password is incorrect")]
    WrongPassword,
    #[error("session token failed verification")]
    SessionInvalid,
    #[error("identity store failure: {0}")]
    Store(String),
}

fn store_err(err: impl std::fmt::Display) -> AuthError {
    AuthError::Store(err.to_string())
}

async fn run<T, F>(pool: &DbPool, op: F) -> Result<T, AuthError>
where
    F: FnOnce(&Connection) -> Result<T, AuthError> + Send + 'static,
    T: Send + 'static,
{
    let pool = pool.clone();
    spawn_blocking(move || {
        let conn = pool.get().map_err(store_err)?;
        op(&conn)
    })
    .await
    .map_err(store_err)?
}

/// Registers a new account and opens its first session.
pub async fn sign_up(
    pool: &DbPool,
    email: &str,
    password: &str,
    ttl_days: i64,
) -> Result<(Principal, String), AuthError> {
    let email = email.trim().to_lowercase();
    if !is_plausible_email(&email) {
        return Err(AuthError::InvalidEmail);
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AuthError::WeakPassword);
    }
    let password = password.to_string();

    run(pool, move |conn| {
        let hash = hash_password(&password)?;
        let created_at = Local::now().to_rfc3339();
        let user_id = match db::insert_user(conn, &email, &hash, &created_at) {
            Ok(id) => id,
            Err(e) if is_unique_violation(&e) => return Err(AuthError::EmailTaken),
            Err(e) => return Err(store_err(e)),
        };
        let token = issue_session(conn, user_id, ttl_days)?;
        Ok((Principal { user_id, email }, token))
    })
    .await
}

/// Verifies credentials and opens a session. Unknown email and wrong
/// password are indistinguishable to the caller.
pub async fn sign_in(
    pool: &DbPool,
    email: &str,
    password: &str,
    ttl_days: i64,
) -> Result<(Principal, String), AuthError> {
    let email = email.trim().to_lowercase();
    let password = password.to_string();

    run(pool, move |conn| {
        let Some((user_id, hash)) = db::user_credentials(conn, &email).map_err(store_err)? else {
            return Err(AuthError::BadCredentials);
        };
        if !verify_password(&hash, &password) {
            return Err(AuthError::BadCredentials);
        }
        let token = issue_session(conn, user_id, ttl_days)?;
        Ok((Principal { user_id, email }, token))
    })
    .await
}

/// Decodes and checks a session token. Unknown tokens, malformed expiry
/// stamps and expired sessions are all rejected the same way.
pub async fn verify_session_token(pool: &DbPool, token: &str) -> Result<Claims, AuthError> {
    let token = token.to_string();
    run(pool, move |conn| {
        let Some((user_id, email, expires_at)) =
            db::session_claims(conn, &token).map_err(store_err)?
        else {
            return Err(AuthError::SessionInvalid);
        };
        let expires =
            DateTime::parse_from_rfc3339(&expires_at).map_err(|_| AuthError::SessionInvalid)?;
        if expires < Local::now() {
            debug!("rejecting expired session for user {user_id}");
            return Err(AuthError::SessionInvalid);
        }
        Ok(Claims { user_id, email })
    })
    .await
}

/// Revokes one session. Idempotent.
pub async fn sign_out(pool: &DbPool, token: &str) -> Result<(), AuthError> {
    let token = token.to_string();
    run(pool, move |conn| {
        db::delete_session(conn, &token).map_err(store_err)
    })
    .await
}

/// Revokes every session the user holds.
pub async fn sign_out_all(pool: &DbPool, user_id: i64) -> Result<(), AuthError> {
    run(pool, move |conn| {
        db::delete_sessions_for_user(conn, user_id).map_err(store_err)
    })
    .await
}

pub async fn session_count(pool: &DbPool, user_id: i64) -> Result<i64, AuthError> {
    run(pool, move |conn| {
        db::session_count(conn, user_id).map_err(store_err)
    })
    .await
}

pub async fn change_password(
    pool: &DbPool,
    email: &str,
    current: &str,
    new: &str,
) -> Result<(), AuthError> {
    if new.len() < MIN_PASSWORD_LEN {
        return Err(AuthError::WeakPassword);
    }
    let email = email.to_string();
    let current = current.to_string();
    let new = new.to_string();

    run(pool, move |conn| {
        let Some((user_id, hash)) = db::user_credentials(conn, &email).map_err(store_err)? else {
            return Err(AuthError::BadCredentials);
        };
        if !verify_password(&hash, &current) {
            return Err(AuthError::WrongPassword);
        }
        let new_hash = hash_password(&new)?;
        db::update_password(conn, user_id, &new_hash).map_err(store_err)?;
        info!("user {user_id} changed password");
        Ok(())
    })
    .await
}

fn issue_session(conn: &Connection, user_id: i64, ttl_days: i64) -> Result<String, AuthError> {
    let token = Uuid::new_v4().to_string();
    let now = Local::now();
    let expires_at = now + Duration::days(ttl_days);
    db::create_session(
        conn,
        user_id,
        &token,
        &now.to_rfc3339(),
        &expires_at.to_rfc3339(),
    )
    .map_err(store_err)?;
    db::prune_sessions(conn, user_id, MAX_SESSIONS).map_err(store_err)?;
    Ok(token)
}

fn is_plausible_email(email: &str) -> bool {
    email.len() >= 3 && email.contains('@') && !email.contains(char::is_whitespace)
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes())
        .map_err(store_err)?;
    Ok(hash.to_string())
}

fn verify_password(hash: &str, password: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
