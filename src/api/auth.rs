use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth;
use crate::errors::AppResult;

use super::extract::AdminUser;
use super::state::AppState;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub user_id: String,
    pub password: String,
    #[serde(default)]
    pub force_logout: bool,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserSummary,
}

#[derive(Serialize)]
pub struct UserSummary {
    pub user_id: String,
    pub balance: rust_decimal::Decimal,
    pub user_type: crate::domain::UserType,
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let (user, pair) = auth::login(
        &state.pool,
        &state.config,
        &body.user_id,
        &body.password,
        body.force_logout,
        ip.as_deref(),
        user_agent.as_deref(),
    )
    .await?;

    Ok(Json(LoginResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        user: UserSummary {
            user_id: user.user_id,
            balance: user.balance,
            user_type: user.user_type,
        },
    }))
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
}

pub async fn refresh_token(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> AppResult<Json<RefreshResponse>> {
    let access_token = auth::refresh(&state.pool, &state.config, &body.refresh_token).await?;
    Ok(Json(RefreshResponse { access_token }))
}

#[derive(Deserialize)]
pub struct KillSessionsRequest {
    pub user_id: i64,
}

/// Administrative forced logout: revoke every live refresh token and bump
/// the target user's `session_version` so all outstanding access tokens
/// stop verifying immediately.
pub async fn kill_sessions(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(body): Json<KillSessionsRequest>,
) -> AppResult<StatusCode> {
    auth::kill_sessions(&state.pool, body.user_id).await?;
    crate::audit::emit_sessions_killed(&state.pool, admin.sub, body.user_id);
    Ok(StatusCode::NO_CONTENT)
}
