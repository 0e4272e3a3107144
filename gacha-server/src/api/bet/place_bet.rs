use axum::{Json, extract::State};
use gacha_sdk::objects::PlaceBetResponse;
use kanau::processor::Processor;

use crate::api::ApiError;
use crate::api::extractors::BetBody;
use crate::state::AppState;

/// `POST /api/bet` - place a bet.
///
/// Returns as soon as the ledger has accepted the bet; the outcome is
/// polled separately.
pub(super) async fn place_bet(
    State(state): State<AppState>,
    BetBody(request): BetBody,
) -> Result<Json<PlaceBetResponse>, ApiError> {
    let submitter = state.bet_submitter().await;
    let placed = submitter.process(request).await?;

    Ok(Json(PlaceBetResponse {
        correlation_id: placed.correlation_id.into(),
    }))
}
