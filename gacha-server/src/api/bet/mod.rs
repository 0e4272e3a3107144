//! Bet API handlers.

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

mod get_bet_status;
mod place_bet;

/// Build the bet router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/bet", post(place_bet::place_bet))
        .route(
            "/bet/{correlation_id}/status",
            get(get_bet_status::get_bet_status),
        )
}
