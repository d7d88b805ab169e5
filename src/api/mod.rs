//! HTTP/JSON transport (§6): a single `/api` base path, bearer-token auth on
//! protected routes, a small set of public routes (health, login, current
//! round, recent winners, games by date, public settings, scan result).

mod admin;
mod auth;
mod bets;
mod extract;
mod games;
mod health;
mod settings;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use state::AppState;

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh-token", post(auth::refresh_token))
        .route("/games/current", get(games::current))
        .route("/games/recent-winners", get(games::recent_winners))
        .route("/games/by-date", get(games::by_date))
        .route("/games/:game_id", get(games::by_id))
        .route("/bets/result/:identifier", get(bets::result))
        .route("/api/settings/public", get(settings::public));

    let protected_routes = Router::new()
        .route("/bets/place", post(bets::place))
        .route("/bets/cancel/:identifier", post(bets::cancel))
        .route("/bets/claim/:identifier", post(bets::claim_slip))
        .route("/bets/scan-claim/:identifier", post(bets::scan_claim))
        .route("/admin/games/:game_id/settle", post(admin::settle))
        .route("/admin/games/live-settlement", get(admin::live_settlement))
        .route("/admin/settings", post(admin::update_setting))
        .route("/admin/sessions/kill", post(auth::kill_sessions));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
