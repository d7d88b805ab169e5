//! Shared fixtures for integration tests: user/round creation helpers that
//! mirror exactly what the handlers themselves insert, so tests exercise
//! real schema constraints instead of a simplified shadow of them.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::auth::password::hash_password;

pub async fn create_user(pool: &PgPool, user_id: &str, password: &str, balance: Decimal) -> i64 {
    let hash = hash_password(password).unwrap();
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO users (user_id, password_hash, balance) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(user_id)
    .bind(hash)
    .bind(balance)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn create_admin(pool: &PgPool, user_id: &str, password: &str, balance: Decimal) -> i64 {
    let id = create_user(pool, user_id, password, balance).await;
    sqlx::query("UPDATE users SET user_type = 'admin' WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .unwrap();
    id
}

/// Inserts an `active` round with zeroed card totals, open for betting for
/// `duration_minutes` from now.
pub async fn create_active_round(pool: &PgPool, game_id: &str, multiplier: Decimal, duration_minutes: i64) {
    let start = Utc::now() - Duration::seconds(1);
    let end = start + Duration::minutes(duration_minutes);
    sqlx::query(
        "INSERT INTO rounds (game_id, start_time, end_time, status, payout_multiplier)
         VALUES ($1, $2, $3, 'active', $4)",
    )
    .bind(game_id)
    .bind(start)
    .bind(end)
    .bind(multiplier)
    .execute(pool)
    .await
    .unwrap();

    for card in 1..=12 {
        sqlx::query(
            "INSERT INTO round_card_totals (game_id, card_number, total_bet_amount) VALUES ($1, $2, 0)",
        )
        .bind(game_id)
        .bind(card)
        .execute(pool)
        .await
        .unwrap();
    }
}

pub async fn complete_round(pool: &PgPool, game_id: &str) {
    sqlx::query("UPDATE rounds SET status = 'completed', end_time = now() WHERE game_id = $1")
        .bind(game_id)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn balance_of(pool: &PgPool, user_id: i64) -> Decimal {
    sqlx::query_scalar("SELECT balance FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .unwrap()
}
