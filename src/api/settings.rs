use std::collections::HashMap;

use axum::extract::State;
use axum::Json;

use crate::errors::AppResult;
use crate::settings::PUBLIC_SETTINGS;

use super::state::AppState;

/// `GET /api/settings/public` — whitelisted settings only. Excludes
/// `game_result_type`, which would reveal whether settlement is automatic
/// or waits on an operator.
pub async fn public(State(state): State<AppState>) -> AppResult<Json<HashMap<String, String>>> {
    let mut out = HashMap::new();
    for key in PUBLIC_SETTINGS {
        let value = state.settings.get_string(key, "").await?;
        out.insert((*key).to_string(), value);
    }
    Ok(Json(out))
}
