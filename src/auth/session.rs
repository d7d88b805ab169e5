//! Single-session enforcement (C5): issue/verify session credentials,
//! enforce at-most-one live refresh token per user, and administrative
//! `kill_sessions`.

use chrono::{Duration as ChronoDuration, Utc};
use sqlx::PgPool;

use super::password::verify_password;
use super::tokens::{
    generate_refresh_token, hash_refresh_token, issue_access_token, verify_access_token, Claims,
};
use crate::config::Config;
use crate::domain::User;
use crate::errors::{AppError, AppResult};

pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

const REFRESH_TOKEN_TTL_DAYS: i64 = 30;
const STALE_TOKEN_HOUSEKEEPING_DAYS: i64 = 7;

/// Verifies credentials and enforces the five-step single-session rule of
/// the component design before issuing a fresh token pair.
pub async fn login(
    pool: &PgPool,
    config: &Config,
    user_id: &str,
    password: &str,
    force_logout: bool,
    ip: Option<&str>,
    user_agent: Option<&str>,
) -> AppResult<(User, TokenPair)> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::Unauthorized("invalid credentials"))?;

    let ok = verify_password(password, &user.password_hash)?;
    record_login_attempt(pool, Some(user.id), user_id, ok, ip, user_agent).await;
    if !ok {
        return Err(AppError::Unauthorized("invalid credentials"));
    }

    let mut tx = pool.begin().await?;

    // Step 1: housekeeping — drop refresh tokens long enough expired that
    // they can never be revoked-and-reused meaningfully.
    let cutoff = Utc::now() - ChronoDuration::days(STALE_TOKEN_HOUSEKEEPING_DAYS);
    sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1 AND expires_at < $2")
        .bind(user.id)
        .bind(cutoff)
        .execute(&mut *tx)
        .await?;

    // Step 2: count live sessions.
    let live_count: i64 = sqlx::query_scalar(
        "SELECT count(*) FROM refresh_tokens
         WHERE user_id = $1 AND revoked = false AND expires_at > now()",
    )
    .bind(user.id)
    .fetch_one(&mut *tx)
    .await?;

    // Step 3: force_logout only has effect when the authenticating user is
    // themselves an administrator; otherwise it is silently ignored.
    let allowed_to_force = force_logout && user.is_admin();
    if live_count > 0 && !allowed_to_force {
        return Err(AppError::Conflict {
            code: "ACTIVE_SESSION_EXISTS",
            message: "an active session already exists for this user".to_string(),
        });
    }

    // Step 4: revoke all existing tokens before issuing a new pair. Failure
    // here fails the whole login closed (Integrity class, never partial).
    let revoked = sqlx::query(
        "UPDATE refresh_tokens SET revoked = true WHERE user_id = $1 AND revoked = false",
    )
    .bind(user.id)
    .execute(&mut *tx)
    .await
    .map_err(|e| AppError::Integrity(format!("failed to revoke existing sessions: {e}")))?;
    let _ = revoked;

    // Step 5: bump last_login / session_version *before* minting the new
    // token so its embedded session_version is the one that invalidates
    // every token issued before this login.
    let new_session_version = user.session_version + 1;
    sqlx::query("UPDATE users SET last_login = now(), session_version = $1 WHERE id = $2")
        .bind(new_session_version)
        .bind(user.id)
        .execute(&mut *tx)
        .await?;

    let pair = mint_pair(&mut tx, config, &user, new_session_version).await?;

    tx.commit().await?;

    let mut user = user;
    user.session_version = new_session_version;
    Ok((user, pair))
}

/// Issues a new access token from a still-valid, non-revoked refresh token,
/// without rotating the refresh token itself.
pub async fn refresh(pool: &PgPool, config: &Config, raw_refresh_token: &str) -> AppResult<String> {
    let hash = hash_refresh_token(&config.refresh_token_secret, raw_refresh_token);
    let row = sqlx::query_as::<_, crate::domain::RefreshToken>(
        "SELECT * FROM refresh_tokens WHERE token_hash = $1",
    )
    .bind(&hash)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::Unauthorized("unknown refresh token"))?;

    if row.revoked || row.expires_at <= Utc::now() {
        return Err(AppError::Unauthorized("refresh token expired or revoked"));
    }

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(row.user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("user"))?;

    issue_access_token(
        &config.access_token_secret,
        user.id,
        &user.user_id,
        user.session_version,
        config.access_token_expiry,
    )
}

/// Verifies a bearer access token against the user's *current* session
/// version, performed on every protected request.
pub async fn verify(pool: &PgPool, config: &Config, token: &str) -> AppResult<Claims> {
    // We need the claimed subject before we know which session_version to
    // check against, so decode loosely first (signature still unchecked at
    // this point; `verify_access_token` below performs the real check).
    let mut insecure = jsonwebtoken::Validation::default();
    insecure.insecure_disable_signature_validation();
    insecure.validate_exp = false;
    let unverified = jsonwebtoken::decode::<Claims>(
        token,
        &jsonwebtoken::DecodingKey::from_secret(&[]),
        &insecure,
    )
    .map_err(|_| AppError::Unauthorized("malformed token"))?;

    let session_version: i64 =
        sqlx::query_scalar("SELECT session_version FROM users WHERE id = $1")
            .bind(unverified.claims.sub)
            .fetch_optional(pool)
            .await?
            .ok_or(AppError::Unauthorized("unknown subject"))?;

    verify_access_token(&config.access_token_secret, token, session_version)
}

/// Administrative, atomic: revoke all active refresh tokens and bump the
/// session version so every outstanding access token is invalidated
/// immediately.
pub async fn kill_sessions(pool: &PgPool, user_id: i64) -> AppResult<()> {
    let mut tx = pool.begin().await?;
    sqlx::query("UPDATE refresh_tokens SET revoked = true WHERE user_id = $1 AND revoked = false")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query(
        "UPDATE users SET last_login = now(), session_version = session_version + 1 WHERE id = $1",
    )
    .bind(user_id)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(())
}

async fn mint_pair(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    config: &Config,
    user: &User,
    session_version: i64,
) -> AppResult<TokenPair> {
    let access_token = issue_access_token(
        &config.access_token_secret,
        user.id,
        &user.user_id,
        session_version,
        config.access_token_expiry,
    )?;

    let raw_refresh = generate_refresh_token();
    let hash = hash_refresh_token(&config.refresh_token_secret, &raw_refresh);
    let expires_at = Utc::now() + ChronoDuration::days(REFRESH_TOKEN_TTL_DAYS);

    sqlx::query(
        "INSERT INTO refresh_tokens (user_id, token_hash, expires_at) VALUES ($1, $2, $3)",
    )
    .bind(user.id)
    .bind(&hash)
    .bind(expires_at)
    .execute(&mut **tx)
    .await?;

    Ok(TokenPair {
        access_token,
        refresh_token: raw_refresh,
    })
}

async fn record_login_attempt(
    pool: &PgPool,
    user_id: Option<i64>,
    user_id_text: &str,
    success: bool,
    ip: Option<&str>,
    user_agent: Option<&str>,
) {
    let result = sqlx::query(
        "INSERT INTO login_history (user_id, user_id_text, success, ip, user_agent)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(user_id)
    .bind(user_id_text)
    .bind(success)
    .bind(ip)
    .bind(user_agent)
    .execute(pool)
    .await;

    if let Err(err) = result {
        tracing::warn!(error = %err, "failed to record login history, ignoring");
    }
}
