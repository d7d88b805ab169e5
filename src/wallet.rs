//! Append-only transaction log + balance mutation, always co-transactional
//! with its cause (C4).
//!
//! Every public primitive here takes an already-open `sqlx::Transaction` and
//! a user row locked by the caller (`SELECT ... FOR UPDATE`), appends exactly
//! one `wallet_log` row, and returns the user's new balance. Callers own the
//! lock acquisition and the eventual commit/rollback.

use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};

use crate::domain::{TransactionDirection, TransactionType};
use crate::errors::{AppError, AppResult};

pub struct LedgerEntry<'a> {
    pub transaction_type: TransactionType,
    pub reference_type: &'a str,
    pub reference_id: Option<&'a str>,
    pub reference_game_id: Option<&'a str>,
    pub comment: Option<&'a str>,
}

/// Reads a user's current balance without taking a lock — for read-only
/// responses (e.g. an idempotent "already claimed" reply) that must not
/// participate in a write transaction.
pub async fn read_balance(
    pool: &sqlx::PgPool,
    user_id: i64,
) -> AppResult<Decimal> {
    sqlx::query_scalar("SELECT balance FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("user"))
}

/// Locks and returns the user row for the given id, failing if absent.
pub async fn lock_user(
    tx: &mut Transaction<'_, Postgres>,
    user_id: i64,
) -> AppResult<crate::domain::User> {
    sqlx::query_as::<_, crate::domain::User>(
        "SELECT * FROM users WHERE id = $1 FOR UPDATE",
    )
    .bind(user_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(AppError::NotFound("user"))
}

pub async fn credit_atomic(
    tx: &mut Transaction<'_, Postgres>,
    user_id: i64,
    amount: Decimal,
    entry: LedgerEntry<'_>,
) -> AppResult<Decimal> {
    let new_balance: Decimal = sqlx::query_scalar(
        "UPDATE users SET balance = balance + $1 WHERE id = $2 RETURNING balance",
    )
    .bind(amount)
    .bind(user_id)
    .fetch_one(&mut **tx)
    .await?;

    append_ledger_row(tx, user_id, amount, TransactionDirection::Credit, entry).await?;
    Ok(new_balance)
}

/// Fails with `InsufficientBalance` if the projected balance would drop below
/// zero, and fails fast if the user's status is not `active`.
pub async fn debit_atomic(
    tx: &mut Transaction<'_, Postgres>,
    user: &crate::domain::User,
    amount: Decimal,
    entry: LedgerEntry<'_>,
) -> AppResult<Decimal> {
    if !user.is_active() {
        return Err(AppError::Conflict {
            code: "USER_NOT_ACTIVE",
            message: "user is not active".to_string(),
        });
    }
    if user.balance < amount {
        return Err(AppError::InsufficientBalance {
            balance: user.balance,
            needed: amount,
        });
    }

    let new_balance: Decimal = sqlx::query_scalar(
        "UPDATE users SET balance = balance - $1 WHERE id = $2 RETURNING balance",
    )
    .bind(amount)
    .bind(user.id)
    .fetch_one(&mut **tx)
    .await?;

    append_ledger_row(tx, user.id, amount, TransactionDirection::Debit, entry).await?;
    Ok(new_balance)
}

async fn append_ledger_row(
    tx: &mut Transaction<'_, Postgres>,
    user_id: i64,
    amount: Decimal,
    direction: TransactionDirection,
    entry: LedgerEntry<'_>,
) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO wallet_log
            (user_id, transaction_type, transaction_direction, amount,
             reference_type, reference_id, reference_game_id, comment)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(user_id)
    .bind(entry.transaction_type)
    .bind(direction)
    .bind(amount)
    .bind(entry.reference_type)
    .bind(entry.reference_id)
    .bind(entry.reference_game_id)
    .bind(entry.comment)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
