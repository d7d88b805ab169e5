//! Atomic round settlement: mark winners/losers, compute per-slip payout
//! (C9). No wallet credits happen here — winnings are paid out lazily on
//! claim (`claim.rs`), which isolates settlement from per-user locking.

use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::domain::{Round, RoundStatus, SettlementStatus};
use crate::errors::{AppError, AppResult};
use crate::settings::{ResultType, SettingsStore};

pub async fn settle(
    pool: &PgPool,
    settings: &SettingsStore,
    game_id: &str,
    winning_card: i32,
    now: chrono::DateTime<chrono::Utc>,
) -> AppResult<()> {
    if !(1..=12).contains(&winning_card) {
        return Err(AppError::Validation("winning_card must be in 1..12".to_string()));
    }

    let result = settle_inner(pool, settings, game_id, winning_card, now).await;
    if let Err(err) = &result {
        mark_failed(pool, game_id, &err.to_string()).await;
    }
    result
}

async fn settle_inner(
    pool: &PgPool,
    settings: &SettingsStore,
    game_id: &str,
    winning_card: i32,
    now: chrono::DateTime<chrono::Utc>,
) -> AppResult<()> {
    let mut tx = pool.begin().await?;

    let round = sqlx::query_as::<_, Round>("SELECT * FROM rounds WHERE game_id = $1 FOR UPDATE")
        .bind(game_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("round"))?;

    if round.settlement_status != SettlementStatus::NotSettled {
        return Err(AppError::Conflict {
            code: "AlreadySettling",
            message: format!("round is already {:?}", round.settlement_status),
        });
    }

    let result_type = settings.result_type().await?;
    let status_ok = match result_type {
        ResultType::Auto => round.status == RoundStatus::Completed,
        ResultType::Manual => {
            round.status == RoundStatus::Active || round.status == RoundStatus::Completed
        }
    };
    if !status_ok {
        return Err(AppError::Conflict {
            code: "RoundNotReady",
            message: "round is not in a settleable state".to_string(),
        });
    }

    sqlx::query(
        "UPDATE rounds SET settlement_status = 'settling', settlement_started_at = $1
         WHERE game_id = $2",
    )
    .bind(now)
    .bind(game_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE bet_details SET is_winner = true, payout_amount = bet_amount * $1
         WHERE game_id = $2 AND card_number = $3",
    )
    .bind(round.payout_multiplier)
    .bind(game_id)
    .bind(winning_card)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE bet_details SET is_winner = false, payout_amount = 0
         WHERE game_id = $1 AND card_number <> $2",
    )
    .bind(game_id)
    .bind(winning_card)
    .execute(&mut *tx)
    .await?;

    // Non-cancelled slips: payout = sum of their details' payouts.
    sqlx::query(
        "UPDATE bet_slips s
         SET payout_amount = d.total,
             status = CASE WHEN d.total > 0 THEN 'won' ELSE 'lost' END
         FROM (
             SELECT slip_id, COALESCE(SUM(payout_amount), 0) AS total
             FROM bet_details
             WHERE game_id = $1
             GROUP BY slip_id
         ) d
         WHERE s.slip_id = d.slip_id AND s.game_id = $1 AND s.cancelled_at IS NULL",
    )
    .bind(game_id)
    .execute(&mut *tx)
    .await?;

    let completes_round = round.status == RoundStatus::Active;
    sqlx::query(
        "UPDATE rounds SET
            status = CASE WHEN $1 THEN 'completed' ELSE status END,
            winning_card = $2,
            settlement_status = 'settled',
            settlement_completed_at = $3,
            settlement_error = NULL
         WHERE game_id = $4",
    )
    .bind(completes_round)
    .bind(winning_card)
    .bind(now)
    .bind(game_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    crate::audit::emit_round_settled(pool, None, game_id, winning_card);
    Ok(())
}

async fn mark_failed(pool: &PgPool, game_id: &str, error: &str) {
    let result = sqlx::query(
        "UPDATE rounds SET settlement_status = 'failed', settlement_error = $1
         WHERE game_id = $2 AND settlement_status <> 'settled'",
    )
    .bind(error)
    .bind(game_id)
    .execute(pool)
    .await;
    if let Err(err) = result {
        tracing::error!(error = %err, game_id, "failed to mark round settlement as failed");
    }
}

/// Total wagered across non-cancelled slips in the round, used by tests of
/// the P8 profitability property and by `live-settlement`-style summaries.
pub async fn total_wagered(pool: &PgPool, game_id: &str) -> AppResult<Decimal> {
    let total: Option<Decimal> = sqlx::query_scalar(
        "SELECT SUM(s.total_amount) FROM bet_slips s
         WHERE s.game_id = $1 AND s.cancelled_at IS NULL",
    )
    .bind(game_id)
    .fetch_one(pool)
    .await?;
    Ok(total.unwrap_or(Decimal::ZERO))
}
