//! Environment-driven process configuration, loaded once at startup and
//! handed to every subsystem via `AppState` — the same "one `Config` struct,
//! loaded once" shape the teacher contract uses for its own `Config`.

use std::env;
use std::time::Duration;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub access_token_expiry: Duration,
    pub barcode_secret: String,
    pub scheduler_enabled: bool,
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;
        let access_token_secret = env::var("ACCESS_TOKEN_SECRET")
            .map_err(|_| anyhow::anyhow!("ACCESS_TOKEN_SECRET must be set"))?;
        let refresh_token_secret = env::var("REFRESH_TOKEN_SECRET")
            .map_err(|_| anyhow::anyhow!("REFRESH_TOKEN_SECRET must be set"))?;
        let barcode_secret = env::var("BARCODE_SECRET")
            .map_err(|_| anyhow::anyhow!("BARCODE_SECRET must be set"))?;

        if is_production() && barcode_secret.len() < 32 {
            anyhow::bail!("BARCODE_SECRET must be at least 32 chars in production");
        }

        let access_token_expiry = parse_expiry(
            &env::var("ACCESS_TOKEN_EXPIRY").unwrap_or_else(|_| "24h".to_string()),
        )?;

        let scheduler_enabled = env::var("DISABLE_SCHEDULER").is_err();
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        Ok(Self {
            database_url,
            access_token_secret,
            refresh_token_secret,
            access_token_expiry,
            barcode_secret,
            scheduler_enabled,
            bind_addr,
        })
    }
}

fn is_production() -> bool {
    matches!(env::var("NODE_ENV").as_deref(), Ok("production"))
}

/// Parses simple durations like `"24h"`, `"30m"`, `"90s"`.
fn parse_expiry(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim();
    let (num, unit) = s.split_at(s.len() - 1);
    let n: u64 = num
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid duration: {s}"))?;
    let secs = match unit {
        "s" => n,
        "m" => n * 60,
        "h" => n * 3600,
        "d" => n * 86_400,
        _ => anyhow::bail!("invalid duration unit in {s}, expected s/m/h/d"),
    };
    Ok(Duration::from_secs(secs))
}
