//! Access-token issuance and verification, and opaque refresh-token minting.
//!
//! Access tokens are JWTs carrying the user's id and `session_version`;
//! verification requires signature validity, non-expiry, *and* that the
//! embedded `session_version` still equals the user row's current value —
//! the check that lets `kill_sessions` invalidate every outstanding access
//! token the instant it runs, without touching any of them.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::{AppError, AppResult};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub user_id: String,
    pub session_version: i64,
    pub exp: i64,
}

pub fn issue_access_token(
    secret: &str,
    user_id: i64,
    user_id_str: &str,
    session_version: i64,
    ttl: Duration,
) -> AppResult<String> {
    let claims = Claims {
        sub: user_id,
        user_id: user_id_str.to_string(),
        session_version,
        exp: (Utc::now() + chrono::Duration::from_std(ttl).unwrap_or_default()).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Unexpected(anyhow::anyhow!("token signing failed: {e}")))
}

/// Requires signature validity, non-expiry, and equality against the
/// caller-supplied `current_session_version` (the user row's live value).
pub fn verify_access_token(
    secret: &str,
    token: &str,
    current_session_version: i64,
) -> AppResult<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("invalid or expired token"))?;

    if data.claims.session_version != current_session_version {
        return Err(AppError::Unauthorized("session version mismatch"));
    }
    Ok(data.claims)
}

/// A raw, random opaque refresh token. The caller stores only its SHA-256
/// hash (`hash_refresh_token`) so a leaked database never discloses usable
/// tokens.
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex_encode(&bytes)
}

pub fn hash_refresh_token(secret: &str, raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(raw.as_bytes());
    hex_encode(&hasher.finalize())
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_accepts_matching_session_version() {
        let token =
            issue_access_token("secret", 1, "u1", 7, Duration::from_secs(3600)).unwrap();
        let claims = verify_access_token("secret", &token, 7).unwrap();
        assert_eq!(claims.sub, 1);
    }

    #[test]
    fn verify_rejects_stale_session_version() {
        let token =
            issue_access_token("secret", 1, "u1", 7, Duration::from_secs(3600)).unwrap();
        assert!(verify_access_token("secret", &token, 8).is_err());
    }

    #[test]
    fn refresh_token_hash_is_deterministic_and_keyed() {
        let raw = generate_refresh_token();
        assert_eq!(
            hash_refresh_token("s1", &raw),
            hash_refresh_token("s1", &raw)
        );
        assert_ne!(hash_refresh_token("s1", &raw), hash_refresh_token("s2", &raw));
    }
}
