//! Create, activate, complete rounds on a 5-minute grid within daily open
//! hours (C6). Every transition is a single `UPDATE ... WHERE status = ...`
//! predicated on the prior status, so concurrent callers racing the same row
//! cannot double-transition it — state is monotonic by construction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::clock::{next_five_minute_boundary_utc, parse_hhmm, round_id_for, to_ist};
use crate::domain::Round;
use crate::errors::AppResult;
use crate::settings::SettingsStore;

/// Computes the next 5-minute IST boundary and, if it falls within the
/// configured daily window and no round for that id already exists, inserts
/// it as `pending` with 12 zeroed card totals. If the boundary is within one
/// minute of `now`, inserts it directly as `active` instead (there would be
/// no time left to flip it from `pending` before it should already be live).
pub async fn create_next_round(
    pool: &PgPool,
    settings: &SettingsStore,
    multiplier_override: Option<Decimal>,
    now: DateTime<Utc>,
) -> AppResult<Option<String>> {
    let boundary = next_five_minute_boundary_utc(now);
    let (window_start, window_end) = settings.game_window().await?;
    let boundary_ist_time = to_ist(boundary).time();

    if boundary_ist_time < window_start || boundary_ist_time >= window_end {
        return Ok(None);
    }

    let game_id = round_id_for(boundary);
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM rounds WHERE game_id = $1)")
        .bind(&game_id)
        .fetch_one(pool)
        .await?;
    if exists {
        return Ok(None);
    }

    let multiplier = match multiplier_override {
        Some(m) => m,
        None => settings.game_multiplier().await?,
    };
    let end_time = boundary + chrono::Duration::minutes(crate::clock::ROUND_DURATION_MINUTES);
    let status = if boundary - now <= chrono::Duration::minutes(1) {
        "active"
    } else {
        "pending"
    };

    let mut tx = pool.begin().await?;
    sqlx::query(
        "INSERT INTO rounds (game_id, start_time, end_time, status, payout_multiplier)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (game_id) DO NOTHING",
    )
    .bind(&game_id)
    .bind(boundary)
    .bind(end_time)
    .bind(status)
    .bind(multiplier)
    .execute(&mut *tx)
    .await?;

    for card in 1..=12 {
        sqlx::query(
            "INSERT INTO round_card_totals (game_id, card_number, total_bet_amount)
             VALUES ($1, $2, 0)
             ON CONFLICT (game_id, card_number) DO NOTHING",
        )
        .bind(&game_id)
        .bind(card)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    Ok(Some(game_id))
}

/// Also parses an arbitrary `"HH:MM"` pair for callers that already hold a
/// window (e.g. tests), bypassing a settings round-trip.
pub fn boundary_within_window(
    boundary_ist: DateTime<chrono::FixedOffset>,
    start: &str,
    end: &str,
) -> bool {
    let (Some(start), Some(end)) = (parse_hhmm(start), parse_hhmm(end)) else {
        return false;
    };
    let t = boundary_ist.time();
    t >= start && t < end
}

/// Flips every `pending` round whose `start_time <= now` to `active`.
pub async fn activate_pending(pool: &PgPool, now: DateTime<Utc>) -> AppResult<u64> {
    let result = sqlx::query(
        "UPDATE rounds SET status = 'active' WHERE status = 'pending' AND start_time <= $1",
    )
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Flips every `active` round whose `end_time <= now` to `completed`.
pub async fn complete_active(pool: &PgPool, now: DateTime<Utc>) -> AppResult<u64> {
    let result = sqlx::query(
        "UPDATE rounds SET status = 'completed' WHERE status = 'active' AND end_time <= $1",
    )
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn find_by_game_id(pool: &PgPool, game_id: &str) -> AppResult<Option<Round>> {
    let round = sqlx::query_as::<_, Round>("SELECT * FROM rounds WHERE game_id = $1")
        .bind(game_id)
        .fetch_optional(pool)
        .await?;
    Ok(round)
}

/// The newest `pending` or `active` round, if any — used by
/// `GET /games/current`.
pub async fn current_round(pool: &PgPool) -> AppResult<Option<Round>> {
    let round = sqlx::query_as::<_, Round>(
        "SELECT * FROM rounds WHERE status IN ('pending', 'active')
         ORDER BY start_time DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;
    Ok(round)
}

pub async fn card_totals(pool: &PgPool, game_id: &str) -> AppResult<Vec<crate::domain::RoundCardTotal>> {
    let rows = sqlx::query_as::<_, crate::domain::RoundCardTotal>(
        "SELECT * FROM round_card_totals WHERE game_id = $1 ORDER BY card_number",
    )
    .bind(game_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
