use axum::extract::State;
use axum::http::StatusCode;

use super::state::AppState;

/// Liveness: the process is up and answering HTTP at all.
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Readiness: the process can actually reach its database.
pub async fn readyz(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => StatusCode::OK,
        Err(err) => {
            tracing::warn!(error = %err, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
