use rust_decimal::Decimal;

use crate::scheduler::recover_on_startup;
use crate::tests::testutils::{complete_round, create_active_round};

/// Startup recovery must settle any round left `completed ∧ not_settled`
/// from a prior process's abrupt shutdown, so nothing stays stuck forever.
#[sqlx::test]
async fn recovery_settles_a_round_stuck_completed_and_unsettled(pool: sqlx::PgPool) {
    let settings = crate::settings::SettingsStore::new(pool.clone());
    settings.set("game_result_type", "auto", None).await.unwrap();

    create_active_round(&pool, "grec1", Decimal::new(1000, 2), 5).await;
    complete_round(&pool, "grec1").await;

    recover_on_startup(&pool, &settings).await.unwrap();

    let settlement_status: String =
        sqlx::query_scalar("SELECT settlement_status FROM rounds WHERE game_id = 'grec1'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(settlement_status, "settled");
}

/// `activate_pending`/`complete_active` catch-up runs before the settle
/// pass, so a round whose window has already elapsed gets flipped to
/// `completed` and then settled in the same recovery call.
#[sqlx::test]
async fn recovery_catches_up_state_transitions_before_settling(pool: sqlx::PgPool) {
    let settings = crate::settings::SettingsStore::new(pool.clone());
    settings.set("game_result_type", "auto", None).await.unwrap();

    // A round whose end_time is already in the past, still marked active.
    create_active_round(&pool, "grec2", Decimal::new(1000, 2), -5).await;

    recover_on_startup(&pool, &settings).await.unwrap();

    let (status, settlement_status): (String, String) = sqlx::query_as(
        "SELECT status, settlement_status FROM rounds WHERE game_id = 'grec2'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(status, "completed");
    assert_eq!(settlement_status, "settled");
}
