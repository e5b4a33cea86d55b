use axum::{
    Json,
    extract::{FromRequestParts, Query},
    http::{request::Parts, StatusCode},
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct SecretQuery {
    secret: Option<String>,
}

/// Extractor that rejects requests without the configured `secret` query
/// parameter.
pub struct PollSecret;

impl FromRequestParts<AppState> for PollSecret {
    type Rejection = (StatusCode, Json<Value>);

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let supplied = Query::<SecretQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(query)| query.secret);

        match supplied {
            Some(secret) if secrets_match(&secret, &state.config.poll_secret) => Ok(Self),
            _ => {
                tracing::warn!("Rejected request to {} with a bad secret", parts.uri.path());
                Err((StatusCode::UNAUTHORIZED, Json(json!({"error": "Unauthorized"}))))
            }
        }
    }
}

/// Compares without stopping at the first differing byte.
fn secrets_match(supplied: &str, expected: &str) -> bool {
    supplied.len() == expected.len()
        && supplied
            .bytes()
            .zip(expected.bytes())
            .fold(0_u8, |diff, (a, b)| diff | (a ^ b))
            == 0
}
