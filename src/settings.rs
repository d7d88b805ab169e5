//! Typed, cached key/value configuration with change audit (C2).
//!
//! Mirrors the teacher's `storage.rs` shape: typed get/set pairs over a
//! single keyed persistence layer, with singleton values cached and the
//! cache invalidated wholesale on any write.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use sqlx::PgPool;

use crate::clock::parse_hhmm;
use crate::errors::{AppError, AppResult};

pub const GAME_MULTIPLIER: &str = "game_multiplier";
pub const MAXIMUM_LIMIT: &str = "maximum_limit";
pub const GAME_START_TIME: &str = "game_start_time";
pub const GAME_END_TIME: &str = "game_end_time";
pub const GAME_RESULT_TYPE: &str = "game_result_type";

/// Settings whitelisted for `GET /api/settings/public` — excludes
/// `game_result_type`, which would reveal whether settlement is automatic.
pub const PUBLIC_SETTINGS: &[&str] = &[
    GAME_MULTIPLIER,
    MAXIMUM_LIMIT,
    GAME_START_TIME,
    GAME_END_TIME,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultType {
    Auto,
    Manual,
}

pub struct SettingsStore {
    pool: PgPool,
    cache: ArcSwapOption<HashMap<String, String>>,
}

impl SettingsStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            cache: ArcSwapOption::empty(),
        }
    }

    async fn cached(&self) -> AppResult<Arc<HashMap<String, String>>> {
        if let Some(cached) = self.cache.load_full() {
            return Ok(cached);
        }
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT key, value FROM settings")
                .fetch_all(&self.pool)
                .await?;
        let map: Arc<HashMap<String, String>> = Arc::new(rows.into_iter().collect());
        self.cache.store(Some(map.clone()));
        Ok(map)
    }

    async fn raw(&self, key: &str, default: &str) -> AppResult<String> {
        let map = self.cached().await?;
        Ok(map.get(key).cloned().unwrap_or_else(|| default.to_string()))
    }

    pub async fn get_string(&self, key: &str, default: &str) -> AppResult<String> {
        self.raw(key, default).await
    }

    async fn get_decimal(&self, key: &str, default: rust_decimal::Decimal) -> AppResult<rust_decimal::Decimal> {
        let raw = self.raw(key, &default.to_string()).await?;
        rust_decimal::Decimal::from_str(&raw)
            .map_err(|_| AppError::Unexpected(anyhow::anyhow!("setting {key} is not numeric")))
    }

    pub async fn game_multiplier(&self) -> AppResult<rust_decimal::Decimal> {
        self.get_decimal(GAME_MULTIPLIER, rust_decimal::Decimal::TEN).await
    }

    pub async fn maximum_limit(&self) -> AppResult<rust_decimal::Decimal> {
        self.get_decimal(MAXIMUM_LIMIT, rust_decimal::Decimal::from(5000)).await
    }

    pub async fn game_window(&self) -> AppResult<(chrono::NaiveTime, chrono::NaiveTime)> {
        let start = self.get_string(GAME_START_TIME, "08:00").await?;
        let end = self.get_string(GAME_END_TIME, "22:00").await?;
        let start = parse_hhmm(&start)
            .ok_or_else(|| AppError::Unexpected(anyhow::anyhow!("bad game_start_time")))?;
        let end = parse_hhmm(&end)
            .ok_or_else(|| AppError::Unexpected(anyhow::anyhow!("bad game_end_time")))?;
        Ok((start, end))
    }

    pub async fn result_type(&self) -> AppResult<ResultType> {
        let raw = self.get_string(GAME_RESULT_TYPE, "manual").await?;
        Ok(match raw.as_str() {
            "auto" => ResultType::Auto,
            _ => ResultType::Manual,
        })
    }

    /// Writes `key = value`, recording the previous value in `settings_log`
    /// and invalidating the cache so the next read sees the new value.
    pub async fn set(&self, key: &str, value: &str, changed_by: Option<&str>) -> AppResult<()> {
        validate_value(key, value)?;

        let mut tx = self.pool.begin().await?;
        let old_value: Option<String> =
            sqlx::query_scalar("SELECT value FROM settings WHERE key = $1")
                .bind(key)
                .fetch_optional(&mut *tx)
                .await?;

        sqlx::query(
            "INSERT INTO settings (key, value, updated_at) VALUES ($1, $2, now())
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()",
        )
        .bind(key)
        .bind(value)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO settings_log (key, old_value, new_value, changed_by)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(key)
        .bind(&old_value)
        .bind(value)
        .bind(changed_by)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        self.cache.store(None);
        Ok(())
    }
}

fn validate_value(key: &str, value: &str) -> AppResult<()> {
    match key {
        GAME_START_TIME | GAME_END_TIME => {
            if parse_hhmm(value).is_none() {
                return Err(AppError::Validation(format!(
                    "{key} must match HH:MM, got {value}"
                )));
            }
        }
        GAME_RESULT_TYPE => {
            if value != "auto" && value != "manual" {
                return Err(AppError::Validation(
                    "game_result_type must be auto or manual".to_string(),
                ));
            }
        }
        GAME_MULTIPLIER | MAXIMUM_LIMIT => {
            if rust_decimal::Decimal::from_str(value).is_err() {
                return Err(AppError::Validation(format!("{key} must be numeric")));
            }
        }
        _ => {}
    }
    Ok(())
}
