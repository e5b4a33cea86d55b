use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::post,
};
use pricematch_core::{Candidate, MatchResult};
use serde::{Deserialize, Serialize};

use super::{api_error, ApiError};
use crate::auth::PollSecret;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/match", post(match_text))
}

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    pub text: String,
    pub threshold: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct EntryMatch {
    pub quantity: u32,
    pub description: String,
    pub result: MatchResult,
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub threshold: f64,
    pub catalog_items: usize,
    pub entries: Vec<EntryMatch>,
}

/// Parse a materials note and rank every entry against the cached catalog.
async fn match_text(
    State(state): State<AppState>,
    _secret: PollSecret,
    Json(request): Json<MatchRequest>,
) -> Result<Json<MatchResponse>, ApiError> {
    let matcher = state.poller.matcher();
    let threshold = request.threshold.unwrap_or(matcher.config().threshold);
    if !(0.0..=1.0).contains(&threshold) {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("threshold must be between 0 and 1, got {threshold}"),
        ));
    }

    let snapshot = state.poller.catalog().await.map_err(|e| {
        tracing::warn!("Catalog unavailable: {}", e);
        api_error(StatusCode::BAD_GATEWAY, e)
    })?;

    let prepared = matcher.prepare_catalog(&snapshot.items);
    let entries = matcher
        .parse_lines(&request.text)
        .into_iter()
        .map(|entry| {
            let ranking = matcher.rank_prepared(&entry, &prepared, threshold);
            EntryMatch {
                quantity: entry.quantity,
                description: entry.description,
                result: ranking.result,
                candidates: ranking.candidates,
            }
        })
        .collect();

    Ok(Json(MatchResponse {
        threshold,
        catalog_items: snapshot.len(),
        entries,
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use axum::http::StatusCode;
    use serde_json::json;

    use crate::api::testing::{post_json, send, state, state_with, FakeApi, SECRET};

    #[tokio::test]
    async fn test_match_reports_entries_and_candidates() {
        let request = post_json(
            &format!("/match?secret={SECRET}"),
            &json!({"text": "2 x foil tape\nmisc supplies\n6\" flex duct"}),
        );
        let (status, body) = send(state(), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["catalog_items"], 3);
        let entries = body["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 3);

        assert_eq!(entries[0]["quantity"], 2);
        assert_eq!(entries[0]["result"]["item_id"], 12);
        assert_eq!(entries[1]["result"]["item_id"], json!(null));
        assert_eq!(entries[2]["description"], "6in flex duct");
        assert_eq!(entries[2]["result"]["item_id"], 10);
        assert_eq!(entries[2]["candidates"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_threshold_override() {
        let request = post_json(
            &format!("/match?secret={SECRET}"),
            &json!({"text": "misc supplies", "threshold": 0.0}),
        );
        let (status, body) = send(state(), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["threshold"], 0.0);
        assert!(!body["entries"][0]["result"]["item_id"].is_null());
    }

    #[tokio::test]
    async fn test_rejects_bad_threshold_and_secret() {
        let body = json!({"text": "foil tape", "threshold": 2.0});
        let (status, _) = send(state(), post_json(&format!("/match?secret={SECRET}"), &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(state(), post_json("/match", &body)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_catalog_unavailable() {
        let api = FakeApi::default();
        api.offline.store(true, Ordering::SeqCst);

        let request = post_json(&format!("/match?secret={SECRET}"), &json!({"text": "foil tape"}));
        let (status, body) = send(state_with(api), request).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["status"], "error");
    }
}
