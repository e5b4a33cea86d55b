mod health;
mod matching;
mod poll;

use axum::{Json, Router, http::StatusCode};
use serde::Serialize;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(matching::router())
        .merge(poll::router())
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub message: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, message: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            status: "error",
            message: message.to_string(),
        }),
    )
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{DateTime, Utc};
    use pricematch_core::servicetitan::{ClientError, ClientResult, FormSubmission};
    use pricematch_core::{
        CatalogCache, CatalogItem, FieldServiceApi, InvoiceLine, Matcher, Poller,
        PricebookSource, ProcessedForms,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::ServerConfig;
    use crate::state::AppState;

    pub const SECRET: &str = "s3cret";

    #[derive(Default)]
    pub struct FakeApi {
        pub offline: AtomicBool,
    }

    #[async_trait::async_trait]
    impl PricebookSource for FakeApi {
        async fn fetch_catalog(&self) -> ClientResult<Vec<CatalogItem>> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(ClientError::Status {
                    status: 503,
                    url: "materials".into(),
                    body: String::new(),
                });
            }
            Ok(vec![
                CatalogItem::new(10_i64, "6in Flex Duct").with_code("FLEX-6IN"),
                CatalogItem::new(11_i64, "Wye Fitting 6in"),
                CatalogItem::new(12_i64, "Foil Tape").with_code("TAPE-FOIL"),
            ])
        }
    }

    #[async_trait::async_trait]
    impl FieldServiceApi for FakeApi {
        async fn recent_submissions(&self, _since: DateTime<Utc>) -> ClientResult<Vec<FormSubmission>> {
            let form = serde_json::from_value(json!({
                "id": 77,
                "owners": [{"type": "Job", "id": 1234}],
                "units": [{"name": "Materials Used", "value": "2 x foil tape\nmisc supplies"}]
            }))
            .map_err(|e| ClientError::Status {
                status: 500,
                url: "forms".into(),
                body: e.to_string(),
            })?;
            Ok(vec![form])
        }

        async fn invoice_for_job(&self, _job_id: i64) -> ClientResult<Option<i64>> {
            Ok(Some(9000))
        }

        async fn add_invoice_items(&self, _invoice_id: i64, _lines: &[InvoiceLine]) -> ClientResult<()> {
            Ok(())
        }
    }

    pub fn state_with(api: FakeApi) -> AppState {
        let api: Arc<dyn FieldServiceApi> = Arc::new(api);
        let poller = Poller::new(
            api,
            Matcher::default(),
            CatalogCache::new(Duration::from_secs(3600)),
            ProcessedForms::in_memory(),
        );
        AppState::new(ServerConfig::new(SECRET), poller)
    }

    pub fn state() -> AppState {
        state_with(FakeApi::default())
    }

    pub async fn send(state: AppState, request: Request<Body>) -> (StatusCode, Value) {
        let app = super::router().with_state(state);
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    pub fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }
}
