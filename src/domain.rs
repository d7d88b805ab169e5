//! Persisted entities. Field shapes mirror `migrations/0001_init.sql`
//! exactly; this module has no behavior of its own beyond small, obviously
//! correct helpers (e.g. `Round::is_active_for_betting`).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// User
// ============================================================================

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct User {
    pub id: i64,
    pub user_id: String,
    #[serde(skip)]
    pub password_hash: String,
    pub status: UserStatus,
    pub user_type: UserType,
    pub balance: Decimal,
    pub last_login: Option<DateTime<Utc>>,
    pub session_version: i64,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_active(&self) -> bool {
        matches!(self.status, UserStatus::Active)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self.user_type, UserType::Admin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Inactive,
    Banned,
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Admin,
    Moderator,
    Player,
}

// ============================================================================
// Round (Game)
// ============================================================================

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Round {
    pub id: i64,
    pub game_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: RoundStatus,
    pub winning_card: Option<i32>,
    pub payout_multiplier: Decimal,
    pub settlement_status: SettlementStatus,
    pub settlement_started_at: Option<DateTime<Utc>>,
    pub settlement_completed_at: Option<DateTime<Utc>>,
    pub settlement_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Round {
    pub fn accepts_bets_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.status, RoundStatus::Active) && now < self.end_time
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RoundStatus {
    Pending,
    Active,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SettlementStatus {
    NotSettled,
    Settling,
    Settled,
    Failed,
}

// ============================================================================
// RoundCardTotal
// ============================================================================

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct RoundCardTotal {
    pub game_id: String,
    pub card_number: i32,
    pub total_bet_amount: Decimal,
}

// ============================================================================
// BetSlip / BetDetail
// ============================================================================

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct BetSlip {
    pub id: i64,
    pub slip_id: Uuid,
    pub user_id: i64,
    pub game_id: String,
    pub total_amount: Decimal,
    pub payout_amount: Decimal,
    pub status: SlipStatus,
    pub claimed: bool,
    pub claimed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub barcode: String,
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl BetSlip {
    pub fn is_cancelled(&self) -> bool {
        self.cancelled_at.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SlipStatus {
    Pending,
    Won,
    Lost,
    Cancelled,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct BetDetail {
    pub id: i64,
    pub slip_id: Uuid,
    pub game_id: String,
    pub user_id: i64,
    pub card_number: i32,
    pub bet_amount: Decimal,
    pub is_winner: bool,
    pub payout_amount: Decimal,
}

// ============================================================================
// WalletLog
// ============================================================================

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct WalletLog {
    pub id: i64,
    pub user_id: i64,
    pub transaction_type: TransactionType,
    pub transaction_direction: TransactionDirection,
    pub amount: Decimal,
    pub reference_type: String,
    pub reference_id: Option<String>,
    pub reference_game_id: Option<String>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Recharge,
    Withdrawal,
    Game,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionDirection {
    Credit,
    Debit,
}

/// Well-known `reference_type` values. Not exhaustive — `admin` and other
/// free-form reference types are stored as plain strings per the data model.
pub mod reference_type {
    pub const BET_PLACEMENT: &str = "bet_placement";
    pub const CLAIM: &str = "claim";
    pub const CANCELLATION: &str = "cancellation";
    pub const ADMIN: &str = "admin";
}

// ============================================================================
// Auth
// ============================================================================

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshToken {
    pub id: i64,
    pub user_id: i64,
    pub token_hash: String,
    pub revoked: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
