use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use gacha_core::entities::{BetStatus, CorrelationId};
use gacha_core::store::GetBetStatus;
use gacha_sdk::objects::BetStatusResponse;
use kanau::processor::Processor;

use crate::api::ApiError;
use crate::state::AppState;

/// `GET /api/bet/{correlation_id}/status` - poll a bet.
///
/// `200` with the record once resolved, `202` while pending.
pub(super) async fn get_bet_status(
    State(state): State<AppState>,
    Path(correlation_id): Path<String>,
) -> Result<(StatusCode, Json<BetStatusResponse>), ApiError> {
    let status = state
        .store
        .process(GetBetStatus {
            correlation_id: CorrelationId::from(correlation_id),
        })
        .await?;

    let code = match status {
        BetStatus::Resolved(_) => StatusCode::OK,
        BetStatus::Pending(_) => StatusCode::ACCEPTED,
    };
    Ok((code, Json(status.into())))
}
