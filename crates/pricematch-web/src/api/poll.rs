use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::get,
};
use pricematch_core::{CycleReport, PollOptions};

use super::{api_error, ApiError};
use crate::auth::PollSecret;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/poll", get(run_poll).post(run_poll))
}

/// Run one polling cycle. `debug` widens the lookback window and `dry_run`
/// matches without touching invoices.
async fn run_poll(
    State(state): State<AppState>,
    _secret: PollSecret,
    Query(options): Query<PollOptions>,
) -> Result<Json<CycleReport>, ApiError> {
    tracing::info!("Poll triggered");

    state
        .poller
        .run_cycle(options)
        .await
        .map(Json)
        .map_err(|e| {
            tracing::error!("Polling failed: {}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, e)
        })
}
