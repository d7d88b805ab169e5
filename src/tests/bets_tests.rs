use rust_decimal::Decimal;

use crate::bets::{place_bet, BetInput, PlaceBetOutcome};
use crate::tests::testutils::{balance_of, create_active_round, create_user};

const SECRET: &[u8] = b"test-barcode-secret-at-least-32-bytes!!";

#[sqlx::test]
async fn places_a_bet_and_debits_the_wallet(pool: sqlx::PgPool) {
    let settings = crate::settings::SettingsStore::new(pool.clone());
    let user_id = create_user(&pool, "alice", "hunter2", Decimal::new(100000, 2)).await;
    create_active_round(&pool, "g1", Decimal::new(1000, 2), 5).await;

    let bets = [BetInput { card_number: 3, bet_amount: Decimal::new(2000, 2) }];
    let outcome = place_bet(&pool, SECRET, &settings, user_id, "g1", &bets, None, chrono::Utc::now())
        .await
        .unwrap();

    match outcome {
        PlaceBetOutcome::Placed { new_balance, .. } => {
            assert_eq!(new_balance, Decimal::new(80000, 2));
        }
        PlaceBetOutcome::Duplicate { .. } => panic!("expected a fresh placement"),
    }
    assert_eq!(balance_of(&pool, user_id).await, Decimal::new(80000, 2));

    let total: Decimal = sqlx::query_scalar(
        "SELECT total_bet_amount FROM round_card_totals WHERE game_id = 'g1' AND card_number = 3",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(total, Decimal::new(2000, 2));
}

/// P5: retrying a placement with the same idempotency key must not debit
/// the wallet a second time.
#[sqlx::test]
async fn repeated_idempotency_key_is_a_no_op_on_retry(pool: sqlx::PgPool) {
    let settings = crate::settings::SettingsStore::new(pool.clone());
    let user_id = create_user(&pool, "bob", "hunter2", Decimal::new(100000, 2)).await;
    create_active_round(&pool, "g2", Decimal::new(1000, 2), 5).await;

    let bets = [BetInput { card_number: 5, bet_amount: Decimal::new(1000, 2) }];
    let first = place_bet(&pool, SECRET, &settings, user_id, "g2", &bets, Some("idem-1"), chrono::Utc::now())
        .await
        .unwrap();
    let first_slip_id = match first {
        PlaceBetOutcome::Placed { slip_id, .. } => slip_id,
        PlaceBetOutcome::Duplicate { .. } => panic!("first call must not be a duplicate"),
    };

    let second = place_bet(&pool, SECRET, &settings, user_id, "g2", &bets, Some("idem-1"), chrono::Utc::now())
        .await
        .unwrap();
    match second {
        PlaceBetOutcome::Duplicate { slip_id, .. } => assert_eq!(slip_id, first_slip_id),
        PlaceBetOutcome::Placed { .. } => panic!("retry with the same key must be a duplicate"),
    }

    assert_eq!(balance_of(&pool, user_id).await, Decimal::new(99000, 2));
}

#[sqlx::test]
async fn rejects_a_bet_on_a_closed_round(pool: sqlx::PgPool) {
    let settings = crate::settings::SettingsStore::new(pool.clone());
    let user_id = create_user(&pool, "carol", "hunter2", Decimal::new(100000, 2)).await;
    create_active_round(&pool, "g3", Decimal::new(1000, 2), 5).await;
    crate::tests::testutils::complete_round(&pool, "g3").await;

    let bets = [BetInput { card_number: 1, bet_amount: Decimal::new(1000, 2) }];
    let result = place_bet(&pool, SECRET, &settings, user_id, "g3", &bets, None, chrono::Utc::now()).await;
    assert!(result.is_err());
    assert_eq!(balance_of(&pool, user_id).await, Decimal::new(100000, 2));
}

#[sqlx::test]
async fn rejects_a_bet_exceeding_the_wallet_balance(pool: sqlx::PgPool) {
    let settings = crate::settings::SettingsStore::new(pool.clone());
    let user_id = create_user(&pool, "dave", "hunter2", Decimal::new(1000, 2)).await;
    create_active_round(&pool, "g4", Decimal::new(1000, 2), 5).await;

    let bets = [BetInput { card_number: 1, bet_amount: Decimal::new(2000, 2) }];
    let result = place_bet(&pool, SECRET, &settings, user_id, "g4", &bets, None, chrono::Utc::now()).await;
    assert!(matches!(result, Err(crate::AppError::InsufficientBalance { .. })));
    assert_eq!(balance_of(&pool, user_id).await, Decimal::new(1000, 2));
}
