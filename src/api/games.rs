use axum::extract::{Path, State};
use axum::Json;
use chrono::TimeZone;
use serde::Serialize;

use crate::domain::{Round, RoundCardTotal};
use crate::errors::{AppError, AppResult};
use crate::rounds;

use super::state::AppState;

#[derive(Serialize)]
pub struct RoundSnapshot {
    #[serde(flatten)]
    pub round: Round,
    pub card_totals: Vec<RoundCardTotal>,
}

/// `GET /games/current` — the newest pending or active round, with its
/// per-card totals so a client can render live coverage.
pub async fn current(State(state): State<AppState>) -> AppResult<Json<Option<RoundSnapshot>>> {
    let Some(round) = rounds::current_round(&state.pool).await? else {
        return Ok(Json(None));
    };
    let card_totals = rounds::card_totals(&state.pool, &round.game_id).await?;
    Ok(Json(Some(RoundSnapshot { round, card_totals })))
}

/// `GET /games/:gameId` — a single round by id, public (used by the
/// read-only scan-result view as well as direct lookups).
pub async fn by_id(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
) -> AppResult<Json<RoundSnapshot>> {
    let round = rounds::find_by_game_id(&state.pool, &game_id)
        .await?
        .ok_or(AppError::NotFound("round"))?;
    let card_totals = rounds::card_totals(&state.pool, &game_id).await?;
    Ok(Json(RoundSnapshot { round, card_totals }))
}

#[derive(serde::Deserialize)]
pub struct RecentWinnersQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    20
}

/// `GET /games/recent-winners` — the most recently settled rounds with
/// their winning card, newest first.
pub async fn recent_winners(
    State(state): State<AppState>,
    axum::extract::Query(query): axum::extract::Query<RecentWinnersQuery>,
) -> AppResult<Json<Vec<Round>>> {
    let limit = query.limit.clamp(1, 200);
    let rows = sqlx::query_as::<_, Round>(
        "SELECT * FROM rounds WHERE settlement_status = 'settled'
         ORDER BY end_time DESC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(rows))
}

#[derive(serde::Deserialize)]
pub struct GamesByDateQuery {
    /// `YYYY-MM-DD`, interpreted in the fixed IST offset the round grid is
    /// built on.
    pub date: String,
}

/// `GET /games/by-date` — every round whose IST start date matches the
/// query, in chronological order.
pub async fn by_date(
    State(state): State<AppState>,
    axum::extract::Query(query): axum::extract::Query<GamesByDateQuery>,
) -> AppResult<Json<Vec<Round>>> {
    let date = chrono::NaiveDate::parse_from_str(&query.date, "%Y-%m-%d")
        .map_err(|_| AppError::Validation("date must be YYYY-MM-DD".to_string()))?;

    let ist = crate::clock::ist_offset();
    let midnight = date.and_hms_opt(0, 0, 0).expect("midnight is a valid time");
    let day_start_ist = ist
        .from_local_datetime(&midnight)
        .single()
        .expect("midnight is unambiguous under a fixed offset");
    let day_start_utc = crate::clock::to_utc(day_start_ist);
    let day_end_utc = day_start_utc + chrono::Duration::days(1);

    let rows = sqlx::query_as::<_, Round>(
        "SELECT * FROM rounds WHERE start_time >= $1 AND start_time < $2 ORDER BY start_time ASC",
    )
    .bind(day_start_utc)
    .bind(day_end_utc)
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(rows))
}
