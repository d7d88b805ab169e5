//! Atomic slip cancellation with refund and card-total compensation (C8).

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{reference_type, BetDetail, BetSlip, TransactionType};
use crate::errors::{AppError, AppResult};
use crate::wallet::{self, LedgerEntry};

pub enum Identifier<'a> {
    SlipId(Uuid),
    Barcode(&'a str),
}

/// Implements the component design's seven-step atomic cancellation: lock
/// the slip, authorize the requester, refuse if claimed or the round is
/// already settled, credit the refund, compensate each card's running total
/// (clamped at zero), and mark the slip no longer eligible to win.
pub async fn cancel_slip(
    pool: &PgPool,
    identifier: Identifier<'_>,
    requester_id: i64,
    is_admin: bool,
    reason: &str,
) -> AppResult<Decimal> {
    let mut tx = pool.begin().await?;

    let slip = lock_slip(&mut tx, identifier).await?;

    if !is_admin && slip.user_id != requester_id {
        return Err(AppError::Forbidden("slip does not belong to requester"));
    }
    if slip.claimed {
        return Err(AppError::Conflict {
            code: "AlreadyClaimed",
            message: "slip has already been claimed".to_string(),
        });
    }
    if slip.is_cancelled() {
        return Err(AppError::Conflict {
            code: "AlreadyCancelled",
            message: "slip has already been cancelled".to_string(),
        });
    }

    let round = sqlx::query_as::<_, crate::domain::Round>(
        "SELECT * FROM rounds WHERE game_id = $1 FOR UPDATE",
    )
    .bind(&slip.game_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("round"))?;

    if round.settlement_status == crate::domain::SettlementStatus::Settled {
        return Err(AppError::Conflict {
            code: "RoundSettled",
            message: "round has already been settled".to_string(),
        });
    }

    let owner = wallet::lock_user(&mut tx, slip.user_id).await?;
    if !owner.is_active() {
        return Err(AppError::Conflict {
            code: "USER_NOT_ACTIVE",
            message: "user is not active".to_string(),
        });
    }

    let comment = format!("cancellation: {reason}");
    wallet::credit_atomic(
        &mut tx,
        slip.user_id,
        slip.total_amount,
        LedgerEntry {
            transaction_type: TransactionType::Game,
            reference_type: reference_type::CANCELLATION,
            reference_id: Some(&slip.slip_id.to_string()),
            reference_game_id: Some(&slip.game_id),
            comment: Some(&comment),
        },
    )
    .await?;

    let details = sqlx::query_as::<_, BetDetail>("SELECT * FROM bet_details WHERE slip_id = $1")
        .bind(slip.slip_id)
        .fetch_all(&mut *tx)
        .await?;

    for detail in &details {
        sqlx::query(
            "UPDATE round_card_totals
             SET total_bet_amount = GREATEST(total_bet_amount - $1, 0)
             WHERE game_id = $2 AND card_number = $3",
        )
        .bind(detail.bet_amount)
        .bind(&slip.game_id)
        .bind(detail.card_number)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query(
        "UPDATE bet_slips SET status = 'cancelled', cancelled_at = now() WHERE slip_id = $1",
    )
    .bind(slip.slip_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    crate::audit::emit_bet_cancelled(pool, requester_id, slip.slip_id, slip.total_amount, reason);

    Ok(slip.total_amount)
}

async fn lock_slip(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    identifier: Identifier<'_>,
) -> AppResult<BetSlip> {
    let slip = match identifier {
        Identifier::SlipId(slip_id) => {
            sqlx::query_as::<_, BetSlip>("SELECT * FROM bet_slips WHERE slip_id = $1 FOR UPDATE")
                .bind(slip_id)
                .fetch_optional(&mut **tx)
                .await?
        }
        Identifier::Barcode(barcode) => sqlx::query_as::<_, BetSlip>(
            "SELECT * FROM bet_slips WHERE upper(barcode) = upper($1) FOR UPDATE",
        )
        .bind(barcode)
        .fetch_optional(&mut **tx)
        .await?,
    };
    slip.ok_or(AppError::NotFound("bet slip"))
}
