//! Atomic, at-most-once credit of a won slip's payout to the owner's wallet
//! (C10).

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::cancel::Identifier;
use crate::domain::{reference_type, BetSlip, Round, SettlementStatus, SlipStatus, TransactionType};
use crate::errors::{AppError, AppResult};
use crate::wallet::{self, LedgerEntry};

pub struct ClaimResult {
    pub slip_id: Uuid,
    pub amount: Decimal,
    pub new_balance: Decimal,
}

pub async fn claim(pool: &PgPool, identifier: Identifier<'_>, requester_id: i64) -> AppResult<ClaimResult> {
    let mut tx = pool.begin().await?;

    let slip = match identifier {
        Identifier::SlipId(slip_id) => {
            sqlx::query_as::<_, BetSlip>("SELECT * FROM bet_slips WHERE slip_id = $1 FOR UPDATE")
                .bind(slip_id)
                .fetch_optional(&mut *tx)
                .await?
        }
        Identifier::Barcode(barcode) => sqlx::query_as::<_, BetSlip>(
            "SELECT * FROM bet_slips WHERE upper(barcode) = upper($1) FOR UPDATE",
        )
        .bind(barcode)
        .fetch_optional(&mut *tx)
        .await?,
    }
    .ok_or(AppError::NotFound("bet slip"))?;

    if slip.user_id != requester_id {
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
            code: "SlipCancelled",
            message: "slip was cancelled and is not claimable".to_string(),
        });
    }
    if slip.status != SlipStatus::Won || slip.payout_amount <= Decimal::ZERO {
        return Err(AppError::Conflict {
            code: "NotAWinningSlip",
            message: "slip is not a won slip with a positive payout".to_string(),
        });
    }

    let round = sqlx::query_as::<_, Round>("SELECT * FROM rounds WHERE game_id = $1")
        .bind(&slip.game_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("round"))?;
    if round.settlement_status != SettlementStatus::Settled {
        return Err(AppError::Conflict {
            code: "RoundNotSettled",
            message: "round has not finished settling".to_string(),
        });
    }

    let owner = wallet::lock_user(&mut tx, slip.user_id).await?;
    if !owner.is_active() {
        return Err(AppError::Conflict {
            code: "USER_NOT_ACTIVE",
            message: "user is not active".to_string(),
        });
    }

    let new_balance = wallet::credit_atomic(
        &mut tx,
        slip.user_id,
        slip.payout_amount,
        LedgerEntry {
            transaction_type: TransactionType::Game,
            reference_type: reference_type::CLAIM,
            reference_id: Some(&slip.slip_id.to_string()),
            reference_game_id: Some(&slip.game_id),
            comment: None,
        },
    )
    .await?;

    sqlx::query("UPDATE bet_slips SET claimed = true, claimed_at = now() WHERE slip_id = $1")
        .bind(slip.slip_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    crate::audit::emit_claim(pool, requester_id, slip.slip_id, slip.payout_amount);

    Ok(ClaimResult {
        slip_id: slip.slip_id,
        amount: slip.payout_amount,
        new_balance,
    })
}

/// Scan-and-claim convenience: read the slip's current status, conditionally
/// invoke `claim`, and respond idempotently if it was already claimed.
pub async fn scan_and_claim(
    pool: &PgPool,
    identifier: Identifier<'_>,
    requester_id: i64,
) -> AppResult<ClaimResult> {
    let existing = match &identifier {
        Identifier::SlipId(slip_id) => {
            sqlx::query_as::<_, BetSlip>("SELECT * FROM bet_slips WHERE slip_id = $1")
                .bind(slip_id)
                .fetch_optional(pool)
                .await?
        }
        Identifier::Barcode(barcode) => sqlx::query_as::<_, BetSlip>(
            "SELECT * FROM bet_slips WHERE upper(barcode) = upper($1)",
        )
        .bind(*barcode)
        .fetch_optional(pool)
        .await?,
    };

    if let Some(slip) = &existing {
        if slip.claimed {
            if slip.user_id != requester_id {
                return Err(AppError::Forbidden("slip does not belong to requester"));
            }
            return Ok(ClaimResult {
                slip_id: slip.slip_id,
                amount: slip.payout_amount,
                new_balance: wallet::read_balance(pool, slip.user_id).await?,
            });
        }
    }

    claim(pool, identifier, requester_id).await
}
