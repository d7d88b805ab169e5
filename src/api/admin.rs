use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::domain::Round;
use crate::errors::AppResult;
use crate::settlement;

use super::extract::AdminUser;
use super::state::AppState;

#[derive(Deserialize)]
pub struct SettleRequest {
    pub winning_card: i32,
}

pub async fn settle(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(game_id): Path<String>,
    Json(body): Json<SettleRequest>,
) -> AppResult<axum::http::StatusCode> {
    settlement::settle(
        &state.pool,
        &state.settings,
        &game_id,
        body.winning_card,
        chrono::Utc::now(),
    )
    .await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct LiveSettlementResponse {
    pub round: Option<Round>,
    pub total_wagered: Option<rust_decimal::Decimal>,
}

/// `GET /admin/games/live-settlement` — prioritizes a round stuck
/// `completed ∧ not_settled` (the operator's most urgent action item);
/// otherwise surfaces the newest `pending`/`active` round so the dashboard
/// always has something to show.
pub async fn live_settlement(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> AppResult<Json<LiveSettlementResponse>> {
    let stuck = sqlx::query_as::<_, Round>(
        "SELECT * FROM rounds WHERE status = 'completed' AND settlement_status = 'not_settled'
         ORDER BY end_time ASC LIMIT 1",
    )
    .fetch_optional(&state.pool)
    .await?;

    let round = match stuck {
        Some(round) => Some(round),
        None => crate::rounds::current_round(&state.pool).await?,
    };

    let total_wagered = match &round {
        Some(round) => Some(settlement::total_wagered(&state.pool, &round.game_id).await?),
        None => None,
    };

    Ok(Json(LiveSettlementResponse { round, total_wagered }))
}

#[derive(Deserialize)]
pub struct UpdateSettingRequest {
    pub key: String,
    pub value: String,
}

pub async fn update_setting(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(body): Json<UpdateSettingRequest>,
) -> AppResult<axum::http::StatusCode> {
    state
        .settings
        .set(&body.key, &body.value, Some(&admin.user_id))
        .await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}
