use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use super::config::{ConfigError, ServiceTitanConfig};
use super::forms::{FormSubmission, JobRecord, Page};
use super::token::{TokenError, TokenProvider};
use crate::cache::PricebookSource;
use crate::catalog::CatalogItem;
use crate::invoice::InvoiceLine;
use crate::poller::FieldServiceApi;

const APP_KEY_HEADER: &str = "ST-App-Key";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Authentication failed: {0}")]
    Token(#[from] TokenError),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} returned {status}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },
}

pub type ClientResult<T> = Result<T, ClientError>;

/// ServiceTitan REST client. Every call carries the bearer token and app key;
/// a 401 forces a token refresh and the request is retried exactly once.
pub struct ServiceTitanClient {
    http: Client,
    config: ServiceTitanConfig,
    tokens: TokenProvider,
}

impl ServiceTitanClient {
    pub fn new(config: ServiceTitanConfig) -> ClientResult<Self> {
        config.validate()?;

        let http = Client::builder()
            .connect_timeout(Duration::from_secs(u64::from(config.connect_timeout_seconds)))
            .timeout(Duration::from_secs(u64::from(config.request_timeout_seconds)))
            .user_agent(concat!("pricematch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let tokens = TokenProvider::new(http.clone(), &config);

        Ok(Self {
            http,
            config,
            tokens,
        })
    }

    #[must_use]
    pub fn with_tokens(mut self, tokens: TokenProvider) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn config(&self) -> &ServiceTitanConfig {
        &self.config
    }

    pub fn tokens(&self) -> &TokenProvider {
        &self.tokens
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    async fn send<F>(&self, build: F) -> ClientResult<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let authorization = self.tokens.authorization().await?;
        let response = self.authorized(&build, &authorization).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        tracing::warn!("{} returned 401, refreshing token and retrying", response.url());
        let authorization = self.tokens.refresh().await?;
        Ok(self.authorized(&build, &authorization).send().await?)
    }

    fn authorized<F>(&self, build: &F, authorization: &str) -> RequestBuilder
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        build(&self.http)
            .header(AUTHORIZATION, authorization)
            .header(APP_KEY_HEADER, &self.config.app_key)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> ClientResult<T> {
        let response = self.send(|http| http.get(url).query(query)).await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    /// All pricebook materials, page by page.
    ///
    /// A failure on the first page is an error. A failure on a later page ends
    /// paging and keeps what was already fetched. Malformed items are skipped.
    pub async fn fetch_materials(&self) -> ClientResult<Vec<CatalogItem>> {
        tracing::info!("Fetching materials from pricebook");

        let url = self.config.endpoint("pricebook", "materials");
        let mut items: Vec<CatalogItem> = Vec::new();
        let mut page: u32 = 1;

        loop {
            let query = [("page", page), ("pageSize", self.config.page_size)];
            let response = self.send(|http| http.get(&url).query(&query)).await?;

            let response = match ensure_success(response).await {
                Ok(response) => response,
                Err(e) if page == 1 => return Err(e),
                Err(e) => {
                    tracing::warn!("Stopping pricebook paging at page {}: {}", page, e);
                    break;
                }
            };

            let body: Page<serde_json::Value> = response.json().await?;
            if body.data.is_empty() {
                break;
            }

            for raw in body.data {
                match serde_json::from_value::<CatalogItem>(raw) {
                    Ok(item) => items.push(item),
                    Err(e) => tracing::warn!("Skipping malformed material: {}", e),
                }
            }

            if let Some(max) = self.config.max_items {
                if items.len() >= max {
                    items.truncate(max);
                    break;
                }
            }
            if !body.has_more {
                break;
            }
            page += 1;
        }

        tracing::info!("Fetched {} materials", items.len());
        Ok(items)
    }

    /// Form submissions modified at or after `since`, first page only.
    pub async fn fetch_form_submissions(
        &self,
        since: DateTime<Utc>,
    ) -> ClientResult<Vec<FormSubmission>> {
        let url = self.config.endpoint("forms", "submissions");
        let query = [
            ("page", "1".to_string()),
            ("pageSize", self.config.forms_page_size.to_string()),
            ("modifiedOnOrAfter", since.format("%Y-%m-%dT%H:%M:%SZ").to_string()),
        ];

        let page: Page<FormSubmission> = self.get_json(&url, &query).await?;
        tracing::info!("Fetched {} forms from API", page.data.len());
        Ok(page.data)
    }

    /// The job's invoice, or `None` when the job cannot be read or has none.
    pub async fn invoice_for_job(&self, job_id: i64) -> ClientResult<Option<i64>> {
        let url = self.config.endpoint("jpm", &format!("jobs/{job_id}"));
        match self.get_json::<JobRecord>(&url, &[]).await {
            Ok(job) => Ok(job.invoice_id()),
            Err(ClientError::Status { status, .. }) => {
                tracing::warn!("Failed to get job {}: {}", job_id, status);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn add_invoice_items(&self, invoice_id: i64, lines: &[InvoiceLine]) -> ClientResult<()> {
        let url = self.config.endpoint("sales", &format!("invoices/{invoice_id}"));
        let payload = serde_json::json!({ "items": lines });

        let response = self.send(|http| http.patch(&url).json(&payload)).await?;
        ensure_success(response).await?;

        tracing::info!("Added {} materials to invoice {}", lines.len(), invoice_id);
        Ok(())
    }
}

async fn ensure_success(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Status {
        status: status.as_u16(),
        url,
        body,
    })
}

#[async_trait::async_trait]
impl PricebookSource for ServiceTitanClient {
    async fn fetch_catalog(&self) -> ClientResult<Vec<CatalogItem>> {
        self.fetch_materials().await
    }
}

#[async_trait::async_trait]
impl FieldServiceApi for ServiceTitanClient {
    async fn recent_submissions(&self, since: DateTime<Utc>) -> ClientResult<Vec<FormSubmission>> {
        self.fetch_form_submissions(since).await
    }

    async fn invoice_for_job(&self, job_id: i64) -> ClientResult<Option<i64>> {
        Self::invoice_for_job(self, job_id).await
    }

    async fn add_invoice_items(&self, invoice_id: i64, lines: &[InvoiceLine]) -> ClientResult<()> {
        Self::add_invoice_items(self, invoice_id, lines).await
    }
}
