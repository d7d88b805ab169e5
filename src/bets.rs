//! Atomic bet placement with idempotency, balance lock, and per-card totals
//! (C7).

use std::collections::HashSet;

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::barcode;
use crate::domain::{reference_type, BetSlip, SlipStatus, TransactionType};
use crate::errors::{AppError, AppResult};
use crate::settings::SettingsStore;
use crate::wallet::{self, LedgerEntry};

#[derive(Debug, Clone, Copy)]
pub struct BetInput {
    pub card_number: i32,
    pub bet_amount: Decimal,
}

pub enum PlaceBetOutcome {
    Placed {
        slip_id: Uuid,
        barcode: String,
        new_balance: Decimal,
    },
    Duplicate {
        slip_id: Uuid,
        barcode: String,
    },
}

/// Implements the component design's ten-step atomic placement: lock the
/// user, short-circuit on a repeated idempotency key, validate the round and
/// the bets, debit the wallet, persist the slip/details, and roll the
/// wager into each card's running total — all inside one transaction.
#[allow(clippy::too_many_arguments)]
pub async fn place_bet(
    pool: &PgPool,
    barcode_secret: &[u8],
    settings: &SettingsStore,
    user_id: i64,
    game_id: &str,
    bets: &[BetInput],
    idempotency_key: Option<&str>,
    now: chrono::DateTime<chrono::Utc>,
) -> AppResult<PlaceBetOutcome> {
    let mut tx = pool.begin().await?;

    let user = wallet::lock_user(&mut tx, user_id).await?;

    if let Some(key) = idempotency_key {
        if let Some(existing) = sqlx::query_as::<_, BetSlip>(
            "SELECT * FROM bet_slips WHERE idempotency_key = $1",
        )
        .bind(key)
        .fetch_optional(&mut *tx)
        .await?
        {
            tx.rollback().await?;
            return Ok(PlaceBetOutcome::Duplicate {
                slip_id: existing.slip_id,
                barcode: existing.barcode,
            });
        }
    }

    let round = sqlx::query_as::<_, crate::domain::Round>(
        "SELECT * FROM rounds WHERE game_id = $1 FOR UPDATE",
    )
    .bind(game_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("round"))?;

    if !round.accepts_bets_at(now) {
        return Err(AppError::Conflict {
            code: "RoundClosed",
            message: "round is not open for betting".to_string(),
        });
    }

    let maximum_limit = settings.maximum_limit().await?;
    validate_bets(bets, maximum_limit)?;
    let total_amount: Decimal = bets.iter().map(|b| b.bet_amount).sum();

    // Generated up front so the debit's ledger row can carry the slip_id as
    // `reference_id` from the start, rather than patching it in afterwards.
    let slip_id = Uuid::new_v4();
    let barcode = barcode::encode(barcode_secret, game_id, slip_id);
    let slip_id_str = slip_id.to_string();

    wallet::debit_atomic(
        &mut tx,
        &user,
        total_amount,
        LedgerEntry {
            transaction_type: TransactionType::Game,
            reference_type: reference_type::BET_PLACEMENT,
            reference_id: Some(&slip_id_str),
            reference_game_id: Some(game_id),
            comment: None,
        },
    )
    .await?;

    sqlx::query(
        "INSERT INTO bet_slips
            (slip_id, user_id, game_id, total_amount, payout_amount, status, barcode, idempotency_key)
         VALUES ($1, $2, $3, $4, 0, 'pending', $5, $6)",
    )
    .bind(slip_id)
    .bind(user_id)
    .bind(game_id)
    .bind(total_amount)
    .bind(&barcode)
    .bind(idempotency_key)
    .execute(&mut *tx)
    .await?;

    for bet in bets {
        sqlx::query(
            "INSERT INTO bet_details (slip_id, game_id, user_id, card_number, bet_amount)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(slip_id)
        .bind(game_id)
        .bind(user_id)
        .bind(bet.card_number)
        .bind(bet.bet_amount)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE round_card_totals SET total_bet_amount = total_bet_amount + $1
             WHERE game_id = $2 AND card_number = $3",
        )
        .bind(bet.bet_amount)
        .bind(game_id)
        .bind(bet.card_number)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    crate::audit::emit_bet_placed(pool, user_id, game_id, slip_id, total_amount);

    Ok(PlaceBetOutcome::Placed {
        slip_id,
        barcode,
        new_balance: user.balance - total_amount,
    })
}

fn validate_bets(bets: &[BetInput], maximum_limit: Decimal) -> AppResult<()> {
    if bets.is_empty() || bets.len() > 12 {
        return Err(AppError::Validation(
            "a slip must contain between 1 and 12 bets".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for bet in bets {
        if !(1..=12).contains(&bet.card_number) {
            return Err(AppError::Validation(format!(
                "card_number {} out of range 1..12",
                bet.card_number
            )));
        }
        if !seen.insert(bet.card_number) {
            return Err(AppError::Validation(format!(
                "card_number {} appears more than once in this slip",
                bet.card_number
            )));
        }
        if bet.bet_amount <= Decimal::ZERO {
            return Err(AppError::Validation("bet_amount must be positive".to_string()));
        }
        if bet.bet_amount > maximum_limit {
            return Err(AppError::Validation(format!(
                "bet_amount {} exceeds maximum_limit {}",
                bet.bet_amount, maximum_limit
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_oversized_slips() {
        assert!(validate_bets(&[], Decimal::new(500000, 2)).is_err());
        let too_many: Vec<BetInput> = (1..=13)
            .map(|_| BetInput {
                card_number: 1,
                bet_amount: Decimal::ONE,
            })
            .collect();
        assert!(validate_bets(&too_many, Decimal::new(500000, 2)).is_err());
    }

    #[test]
    fn rejects_duplicate_card_numbers() {
        let bets = [
            BetInput { card_number: 3, bet_amount: Decimal::ONE },
            BetInput { card_number: 3, bet_amount: Decimal::ONE },
        ];
        assert!(validate_bets(&bets, Decimal::new(500000, 2)).is_err());
    }

    #[test]
    fn rejects_over_limit_amount() {
        let bets = [BetInput {
            card_number: 1,
            bet_amount: Decimal::new(600000, 2),
        }];
        assert!(validate_bets(&bets, Decimal::new(500000, 2)).is_err());
    }

    #[test]
    fn accepts_a_well_formed_slip() {
        let bets = [
            BetInput { card_number: 3, bet_amount: Decimal::new(5000, 2) },
            BetInput { card_number: 7, bet_amount: Decimal::new(3000, 2) },
        ];
        assert!(validate_bets(&bets, Decimal::new(500000, 2)).is_ok());
    }
}
