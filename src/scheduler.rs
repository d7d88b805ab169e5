//! Periodic drivers (C12): next-round creation, state transitions, and
//! auto-settlement, run as cooperative `tokio::time::interval` loops that
//! never share mutable state with request handlers except through the
//! database. Mirrors the teacher's epoch-cycling shape (§4.12) but as a
//! plain async task instead of an on-chain cron entrypoint.

use std::time::Duration;

use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::domain::Round;
use crate::selector;
use crate::settings::{ResultType, SettingsStore};

const NEXT_ROUND_TICK: Duration = Duration::from_secs(5 * 60);
const STATE_TICK: Duration = Duration::from_secs(60);
const AUTO_SETTLE_TICK: Duration = Duration::from_secs(5);
const MANUAL_MODE_GRACE_SECONDS: i64 = 10;
const AUTO_SETTLE_BATCH_SIZE: i64 = 10;

/// Spawns the three timer loops and runs until `shutdown` resolves. Each
/// tick's body is wrapped so a panic or error is logged via
/// `tracing::error!` and never kills the loop — a single bad round must not
/// take down next-round creation or state transitions for every other round.
pub async fn run(pool: PgPool, settings: std::sync::Arc<SettingsStore>, shutdown: impl std::future::Future<Output = ()>) {
    let next_round_pool = pool.clone();
    let next_round_settings = settings.clone();
    let next_round_loop = async move {
        let mut interval = tokio::time::interval(NEXT_ROUND_TICK);
        loop {
            interval.tick().await;
            if let Err(err) = tick_next_round(&next_round_pool, &next_round_settings).await {
                tracing::error!(error = %err, "next-round tick failed");
            }
        }
    };

    let state_pool = pool.clone();
    let state_loop = async move {
        let mut interval = tokio::time::interval(STATE_TICK);
        loop {
            interval.tick().await;
            if let Err(err) = tick_state(&state_pool).await {
                tracing::error!(error = %err, "state tick failed");
            }
        }
    };

    let settle_pool = pool.clone();
    let settle_settings = settings.clone();
    let settle_loop = async move {
        let mut interval = tokio::time::interval(AUTO_SETTLE_TICK);
        loop {
            interval.tick().await;
            if let Err(err) = tick_auto_settle(&settle_pool, &settle_settings).await {
                tracing::error!(error = %err, "auto-settle tick failed");
            }
        }
    };

    tokio::select! {
        _ = next_round_loop => {},
        _ = state_loop => {},
        _ = settle_loop => {},
        _ = shutdown => {
            tracing::info!("scheduler shutting down, in-flight ticks will finish or roll back");
        }
    }
}

async fn tick_next_round(pool: &PgPool, settings: &SettingsStore) -> crate::errors::AppResult<()> {
    let now = chrono::Utc::now();
    if let Some(game_id) = crate::rounds::create_next_round(pool, settings, None, now).await? {
        tracing::info!(game_id, "created next round");
    }
    Ok(())
}

async fn tick_state(pool: &PgPool) -> crate::errors::AppResult<()> {
    let now = chrono::Utc::now();
    let activated = crate::rounds::activate_pending(pool, now).await?;
    let completed = crate::rounds::complete_active(pool, now).await?;
    if activated > 0 || completed > 0 {
        tracing::info!(activated, completed, "round state tick");
    }
    Ok(())
}

async fn tick_auto_settle(pool: &PgPool, settings: &SettingsStore) -> crate::errors::AppResult<()> {
    let now = chrono::Utc::now();
    let result_type = settings.result_type().await?;
    let candidates = settleable_rounds(pool, result_type, now).await?;
    for round in candidates {
        if let Err(err) = settle_one(pool, settings, &round, now).await {
            tracing::error!(error = %err, game_id = %round.game_id, "auto-settle failed for round");
        }
    }
    Ok(())
}

/// Rounds eligible for auto-settlement this tick: `completed ∧
/// not_settled`, limited to a small batch and, in manual mode, only those
/// past the grace window (giving an operator a last chance to settle by
/// hand before the scheduler takes over).
async fn settleable_rounds(
    pool: &PgPool,
    result_type: ResultType,
    now: chrono::DateTime<chrono::Utc>,
) -> crate::errors::AppResult<Vec<Round>> {
    let rounds = match result_type {
        ResultType::Auto => {
            sqlx::query_as::<_, Round>(
                "SELECT * FROM rounds
                 WHERE status = 'completed' AND settlement_status = 'not_settled'
                 ORDER BY end_time ASC
                 LIMIT $1",
            )
            .bind(AUTO_SETTLE_BATCH_SIZE)
            .fetch_all(pool)
            .await?
        }
        ResultType::Manual => {
            let cutoff = now - chrono::Duration::seconds(MANUAL_MODE_GRACE_SECONDS);
            sqlx::query_as::<_, Round>(
                "SELECT * FROM rounds
                 WHERE status = 'completed' AND settlement_status = 'not_settled'
                   AND end_time <= $1
                 ORDER BY end_time ASC
                 LIMIT $2",
            )
            .bind(cutoff)
            .bind(AUTO_SETTLE_BATCH_SIZE)
            .fetch_all(pool)
            .await?
        }
    };
    Ok(rounds)
}

async fn settle_one(
    pool: &PgPool,
    settings: &SettingsStore,
    round: &Round,
    now: chrono::DateTime<chrono::Utc>,
) -> crate::errors::AppResult<()> {
    let totals = crate::rounds::card_totals(pool, &round.game_id).await?;
    let mut bets = [Decimal::ZERO; 12];
    for total in totals {
        if (1..=12).contains(&total.card_number) {
            bets[(total.card_number - 1) as usize] = total.total_bet_amount;
        }
    }

    let winning_card = selector::choose_winning_card(&bets);

    crate::settlement::settle(pool, settings, &round.game_id, winning_card, now).await
}

/// Runs once, synchronously, before the server starts accepting traffic:
/// catches up pending/active/completed state transitions, backfills any
/// round boundaries missed while the process was down, and drains any
/// rounds stuck `completed ∧ not_settled` so nothing is left hanging.
pub async fn recover_on_startup(pool: &PgPool, settings: &SettingsStore) -> crate::errors::AppResult<()> {
    let now = chrono::Utc::now();

    crate::rounds::activate_pending(pool, now).await?;
    crate::rounds::complete_active(pool, now).await?;

    backfill_missing_rounds(pool, settings, now).await?;

    tick_auto_settle(pool, settings).await?;

    Ok(())
}

/// Scans for the latest round and creates any 5-minute boundaries between
/// it and `now` that fall inside the daily window, so a long outage doesn't
/// leave a gap in the round sequence.
async fn backfill_missing_rounds(
    pool: &PgPool,
    settings: &SettingsStore,
    now: chrono::DateTime<chrono::Utc>,
) -> crate::errors::AppResult<()> {
    let latest_end: Option<chrono::DateTime<chrono::Utc>> =
        sqlx::query_scalar("SELECT MAX(end_time) FROM rounds")
            .fetch_one(pool)
            .await?;

    let mut boundary = match latest_end {
        Some(end) => end,
        None => crate::clock::next_five_minute_boundary_utc(now) - chrono::Duration::minutes(crate::clock::ROUND_DURATION_MINUTES),
    };

    let mut guard = 0;
    while boundary < now && guard < 10_000 {
        boundary += chrono::Duration::minutes(crate::clock::ROUND_DURATION_MINUTES);
        crate::rounds::create_next_round(pool, settings, None, boundary - chrono::Duration::seconds(1)).await?;
        guard += 1;
    }
    Ok(())
}
