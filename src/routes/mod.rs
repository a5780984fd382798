// Routes module - wires every HTTP endpoint to its handler

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::app_state::SharedState;
use crate::handlers::*;

/// (method, path, description) for the startup listing
pub const ENDPOINTS: &[(&str, &str, &str)] = &[
    ("GET", "/health", "Service status"),
    ("POST", "/groups", "Submit a signed atomic transaction group"),
    ("GET", "/height", "Current height and round"),
    ("GET", "/rounds/:index", "Round record"),
    ("GET", "/rounds/:index/bets/:address", "Bet record"),
    ("GET", "/accounts/:address", "Balance and receipt assets"),
    ("GET", "/oracle/:oracle_ref", "Published oracle price"),
    ("GET", "/activity", "Ledger activity log"),
];

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        // ===== HEALTH CHECK =====
        .route("/", get(health_check))
        .route("/health", get(health_check))
        // ===== TRANSACTIONS =====
        .route("/groups", post(submit_group))
        // ===== MARKET VIEWS =====
        .route("/height", get(get_height))
        .route("/rounds/:index", get(get_round))
        .route("/rounds/:index/bets/:address", get(get_bet))
        .route("/oracle/:oracle_ref", get(get_oracle))
        // ===== LEDGER VIEWS =====
        .route("/accounts/:address", get(get_account))
        .route("/activity", get(get_activity))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
