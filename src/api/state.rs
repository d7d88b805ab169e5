use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::settings::SettingsStore;

/// Everything a handler needs, cloned cheaply per request (`PgPool` and
/// `Arc<SettingsStore>` are themselves cheap handles).
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub settings: Arc<SettingsStore>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        let settings = Arc::new(SettingsStore::new(pool.clone()));
        Self {
            pool,
            config: Arc::new(config),
            settings,
        }
    }

    pub fn barcode_secret(&self) -> &[u8] {
        self.config.barcode_secret.as_bytes()
    }
}
