use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::auth::{self, Claims};
use crate::errors::AppError;

use super::state::AppState;

/// The authenticated caller, extracted from a bearer access token and
/// verified against the user's live `session_version` on every request —
/// the same check `auth::verify` performs for any other caller.
pub struct AuthUser(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized("missing Authorization header"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AppError::Unauthorized("Authorization header must be a Bearer token"))?;

        let claims = auth::verify(&state.pool, &state.config, token).await?;
        Ok(AuthUser(claims))
    }
}

/// Like `AuthUser`, but additionally confirms the caller's `user_type` is
/// `admin` in the database (the JWT doesn't carry `user_type`, so a fresh
/// row read is unavoidable — admin actions are rare enough that this is
/// the right tradeoff over caching it in the token).
pub struct AdminUser(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(claims) = AuthUser::from_request_parts(parts, state).await?;

        let is_admin: bool = sqlx::query_scalar(
            "SELECT user_type = 'admin' FROM users WHERE id = $1",
        )
        .bind(claims.sub)
        .fetch_optional(&state.pool)
        .await?
        .unwrap_or(false);

        if !is_admin {
            return Err(AppError::Forbidden("admin privileges required"));
        }
        Ok(AdminUser(claims))
    }
}
