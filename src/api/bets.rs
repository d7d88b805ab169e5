use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bets::{self, BetInput, PlaceBetOutcome};
use crate::cancel::{self, Identifier};
use crate::claim;
use crate::domain::BetSlip;
use crate::errors::{AppError, AppResult};

use super::extract::AuthUser;
use super::state::AppState;

#[derive(Deserialize)]
pub struct BetInputRequest {
    pub card_number: i32,
    pub bet_amount: Decimal,
}

#[derive(Deserialize)]
pub struct PlaceBetRequest {
    pub game_id: String,
    pub bets: Vec<BetInputRequest>,
}

#[derive(Serialize)]
pub struct PlaceBetResponse {
    pub slip_id: Uuid,
    pub barcode: String,
    pub new_balance: Decimal,
    pub duplicate: bool,
}

const IDEMPOTENCY_HEADER: &str = "x-idempotency-key";

pub async fn place(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    headers: HeaderMap,
    Json(body): Json<PlaceBetRequest>,
) -> AppResult<Json<PlaceBetResponse>> {
    let idempotency_key = headers
        .get(IDEMPOTENCY_HEADER)
        .and_then(|v| v.to_str().ok());

    let inputs: Vec<BetInput> = body
        .bets
        .iter()
        .map(|b| BetInput {
            card_number: b.card_number,
            bet_amount: b.bet_amount,
        })
        .collect();

    let outcome = bets::place_bet(
        &state.pool,
        state.barcode_secret(),
        &state.settings,
        claims.sub,
        &body.game_id,
        &inputs,
        idempotency_key,
        chrono::Utc::now(),
    )
    .await?;

    Ok(Json(match outcome {
        PlaceBetOutcome::Placed {
            slip_id,
            barcode,
            new_balance,
        } => PlaceBetResponse {
            slip_id,
            barcode,
            new_balance,
            duplicate: false,
        },
        PlaceBetOutcome::Duplicate { slip_id, barcode } => PlaceBetResponse {
            slip_id,
            barcode,
            new_balance: Decimal::ZERO,
            duplicate: true,
        },
    }))
}

/// Accepts either a slip UUID or a barcode string as the path segment.
fn parse_identifier(raw: &str) -> Identifier<'_> {
    match Uuid::parse_str(raw) {
        Ok(id) => Identifier::SlipId(id),
        Err(_) => Identifier::Barcode(raw),
    }
}

#[derive(Deserialize)]
pub struct CancelRequest {
    #[serde(default = "default_cancel_reason")]
    pub reason: String,
}

fn default_cancel_reason() -> String {
    "player requested".to_string()
}

#[derive(Serialize)]
pub struct CancelResponse {
    pub refunded: Decimal,
}

pub async fn cancel(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(identifier): Path<String>,
    Json(body): Json<CancelRequest>,
) -> AppResult<Json<CancelResponse>> {
    let is_admin: bool = sqlx::query_scalar("SELECT user_type = 'admin' FROM users WHERE id = $1")
        .bind(claims.sub)
        .fetch_optional(&state.pool)
        .await?
        .unwrap_or(false);

    let refunded = cancel::cancel_slip(
        &state.pool,
        parse_identifier(&identifier),
        claims.sub,
        is_admin,
        &body.reason,
    )
    .await?;

    Ok(Json(CancelResponse { refunded }))
}

#[derive(Serialize)]
pub struct ClaimResponse {
    pub slip_id: Uuid,
    pub amount: Decimal,
    pub new_balance: Decimal,
}

pub async fn claim_slip(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(identifier): Path<String>,
) -> AppResult<Json<ClaimResponse>> {
    let result = claim::claim(&state.pool, parse_identifier(&identifier), claims.sub).await?;
    Ok(Json(ClaimResponse {
        slip_id: result.slip_id,
        amount: result.amount,
        new_balance: result.new_balance,
    }))
}

/// `POST /bets/scan-claim/:identifier` — the scan-and-go path a cashier's
/// barcode reader drives: claims if unclaimed, replies idempotently if the
/// slip was already claimed.
pub async fn scan_claim(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(identifier): Path<String>,
) -> AppResult<Json<ClaimResponse>> {
    let result = claim::scan_and_claim(&state.pool, parse_identifier(&identifier), claims.sub).await?;
    Ok(Json(ClaimResponse {
        slip_id: result.slip_id,
        amount: result.amount,
        new_balance: result.new_balance,
    }))
}

#[derive(Serialize)]
pub struct SlipResultResponse {
    pub slip_id: Uuid,
    pub game_id: String,
    pub total_amount: Decimal,
    pub payout_amount: Decimal,
    pub status: crate::domain::SlipStatus,
    pub claimed: bool,
    pub cancelled: bool,
}

/// `GET /bets/result/:identifier` — public, read-only. Deliberately omits
/// `user_id` and wallet details so a barcode alone can't be used to probe
/// another player's account.
pub async fn result(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> AppResult<Json<SlipResultResponse>> {
    let slip = match parse_identifier(&identifier) {
        Identifier::SlipId(slip_id) => {
            sqlx::query_as::<_, BetSlip>("SELECT * FROM bet_slips WHERE slip_id = $1")
                .bind(slip_id)
                .fetch_optional(&state.pool)
                .await?
        }
        Identifier::Barcode(barcode) => {
            sqlx::query_as::<_, BetSlip>("SELECT * FROM bet_slips WHERE upper(barcode) = upper($1)")
                .bind(barcode)
                .fetch_optional(&state.pool)
                .await?
        }
    }
    .ok_or(AppError::NotFound("bet slip"))?;

    Ok(Json(SlipResultResponse {
        slip_id: slip.slip_id,
        game_id: slip.game_id,
        total_amount: slip.total_amount,
        payout_amount: slip.payout_amount,
        status: slip.status,
        claimed: slip.claimed,
        cancelled: slip.is_cancelled(),
    }))
}
