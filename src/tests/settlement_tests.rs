use rust_decimal::Decimal;

use crate::bets::{place_bet, BetInput, PlaceBetOutcome};
use crate::cancel::{cancel_slip, Identifier};
use crate::claim::claim;
use crate::settlement::settle;
use crate::tests::testutils::{balance_of, complete_round, create_active_round, create_user};

const SECRET: &[u8] = b"test-barcode-secret-at-least-32-bytes!!";

async fn place_one(pool: &sqlx::PgPool, settings: &crate::settings::SettingsStore, user_id: i64, game_id: &str, card: i32, amount: Decimal) -> uuid::Uuid {
    let bets = [BetInput { card_number: card, bet_amount: amount }];
    match place_bet(pool, SECRET, settings, user_id, game_id, &bets, None, chrono::Utc::now()).await.unwrap() {
        PlaceBetOutcome::Placed { slip_id, .. } => slip_id,
        PlaceBetOutcome::Duplicate { .. } => unreachable!(),
    }
}

/// End-to-end: place, settle, claim. A winning slip's payout equals
/// `bet_amount * payout_multiplier`, credited only on claim.
#[sqlx::test]
async fn settling_a_round_marks_winners_and_claim_pays_out(pool: sqlx::PgPool) {
    let settings = crate::settings::SettingsStore::new(pool.clone());
    let user_id = create_user(&pool, "ivan", "hunter2", Decimal::new(100000, 2)).await;
    create_active_round(&pool, "gs1", Decimal::new(1000, 2), 5).await;
    let slip_id = place_one(&pool, &settings, user_id, "gs1", 6, Decimal::new(1000, 2)).await;
    complete_round(&pool, "gs1").await;

    settle(&pool, &settings, "gs1", 6, chrono::Utc::now()).await.unwrap();

    let status: String = sqlx::query_scalar("SELECT status FROM bet_slips WHERE slip_id = $1")
        .bind(slip_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(status, "won");

    let after_settlement_balance = balance_of(&pool, user_id).await;
    let result = claim(&pool, Identifier::SlipId(slip_id), user_id).await.unwrap();
    assert_eq!(result.amount, Decimal::new(10000, 2)); // 10.00 stake * 10x multiplier
    assert_eq!(balance_of(&pool, user_id).await, after_settlement_balance + result.amount);
}

/// P4: claiming the same winning slip twice must only credit the wallet
/// once.
#[sqlx::test]
async fn double_claim_is_rejected_after_the_first(pool: sqlx::PgPool) {
    let settings = crate::settings::SettingsStore::new(pool.clone());
    let user_id = create_user(&pool, "judy", "hunter2", Decimal::new(100000, 2)).await;
    create_active_round(&pool, "gs2", Decimal::new(1000, 2), 5).await;
    let slip_id = place_one(&pool, &settings, user_id, "gs2", 2, Decimal::new(1000, 2)).await;
    complete_round(&pool, "gs2").await;
    settle(&pool, &settings, "gs2", 2, chrono::Utc::now()).await.unwrap();

    claim(&pool, Identifier::SlipId(slip_id), user_id).await.unwrap();
    let balance_after_first_claim = balance_of(&pool, user_id).await;

    let second = claim(&pool, Identifier::SlipId(slip_id), user_id).await;
    assert!(matches!(second, Err(crate::AppError::Conflict { code: "AlreadyClaimed", .. })));
    assert_eq!(balance_of(&pool, user_id).await, balance_after_first_claim);
}

/// A losing slip settles with zero payout and is never claimable.
#[sqlx::test]
async fn a_losing_slip_cannot_be_claimed(pool: sqlx::PgPool) {
    let settings = crate::settings::SettingsStore::new(pool.clone());
    let user_id = create_user(&pool, "mallory", "hunter2", Decimal::new(100000, 2)).await;
    create_active_round(&pool, "gs3", Decimal::new(1000, 2), 5).await;
    let slip_id = place_one(&pool, &settings, user_id, "gs3", 9, Decimal::new(1000, 2)).await;
    complete_round(&pool, "gs3").await;
    settle(&pool, &settings, "gs3", 3, chrono::Utc::now()).await.unwrap();

    let result = claim(&pool, Identifier::SlipId(slip_id), user_id).await;
    assert!(matches!(result, Err(crate::AppError::Conflict { code: "NotAWinningSlip", .. })));
}

/// A cancelled slip is excluded from settlement's winner computation, even
/// though its bet_details rows are still marked won/lost for bookkeeping.
#[sqlx::test]
async fn a_cancelled_slip_is_excluded_from_settlement_payout(pool: sqlx::PgPool) {
    let settings = crate::settings::SettingsStore::new(pool.clone());
    let user_id = create_user(&pool, "niaj", "hunter2", Decimal::new(100000, 2)).await;
    create_active_round(&pool, "gs4", Decimal::new(1000, 2), 5).await;
    let slip_id = place_one(&pool, &settings, user_id, "gs4", 8, Decimal::new(1000, 2)).await;
    cancel_slip(&pool, Identifier::SlipId(slip_id), user_id, false, "testing").await.unwrap();
    complete_round(&pool, "gs4").await;

    settle(&pool, &settings, "gs4", 8, chrono::Utc::now()).await.unwrap();

    let status: String = sqlx::query_scalar("SELECT status FROM bet_slips WHERE slip_id = $1")
        .bind(slip_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(status, "cancelled", "settlement must not overwrite a cancelled slip's status");
}
