//! Fire-and-forget audit logging (§5: "after commit to avoid lock
//! contention; its failure never affects correctness").
//!
//! Mirrors the teacher's `events.rs` shape of one `emit_*` function per
//! significant action, except each function here both logs a structured
//! `tracing` event immediately and spawns a best-effort `audit_log` insert —
//! callers invoke these only after their own transaction has committed.

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

fn spawn_insert(
    pool: PgPool,
    actor_id: Option<String>,
    action: &'static str,
    target_type: &'static str,
    target_id: String,
    details: String,
) {
    tokio::spawn(async move {
        let result = sqlx::query(
            "INSERT INTO audit_log (actor_id, action, target_type, target_id, details)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(actor_id)
        .bind(action)
        .bind(target_type)
        .bind(target_id)
        .bind(details)
        .execute(&pool)
        .await;

        if let Err(err) = result {
            tracing::warn!(error = %err, action, "audit log insert failed, ignoring");
        }
    });
}

pub fn emit_bet_placed(pool: &PgPool, user_id: i64, game_id: &str, slip_id: Uuid, amount: Decimal) {
    tracing::info!(user_id, game_id, %slip_id, %amount, "bet placed");
    spawn_insert(
        pool.clone(),
        Some(user_id.to_string()),
        "bet_placed",
        "bet_slip",
        slip_id.to_string(),
        format!("game_id={game_id} amount={amount}"),
    );
}

pub fn emit_bet_cancelled(
    pool: &PgPool,
    actor_id: i64,
    slip_id: Uuid,
    refund_amount: Decimal,
    reason: &str,
) {
    tracing::info!(actor_id, %slip_id, %refund_amount, reason, "bet cancelled");
    spawn_insert(
        pool.clone(),
        Some(actor_id.to_string()),
        "bet_cancelled",
        "bet_slip",
        slip_id.to_string(),
        format!("refund={refund_amount} reason={reason}"),
    );
}

pub fn emit_round_settled(pool: &PgPool, actor_id: Option<&str>, game_id: &str, winning_card: i32) {
    tracing::info!(game_id, winning_card, "round settled");
    spawn_insert(
        pool.clone(),
        actor_id.map(|s| s.to_string()),
        "round_settled",
        "round",
        game_id.to_string(),
        format!("winning_card={winning_card}"),
    );
}

pub fn emit_claim(pool: &PgPool, user_id: i64, slip_id: Uuid, amount: Decimal) {
    tracing::info!(user_id, %slip_id, %amount, "slip claimed");
    spawn_insert(
        pool.clone(),
        Some(user_id.to_string()),
        "slip_claimed",
        "bet_slip",
        slip_id.to_string(),
        format!("amount={amount}"),
    );
}

pub fn emit_sessions_killed(pool: &PgPool, admin_id: i64, target_user_id: i64) {
    tracing::info!(admin_id, target_user_id, "sessions killed");
    spawn_insert(
        pool.clone(),
        Some(admin_id.to_string()),
        "sessions_killed",
        "user",
        target_user_id.to_string(),
        String::new(),
    );
}
