use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeDelta, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::config::ServiceTitanConfig;

const DEFAULT_EXPIRES_IN: i64 = 900;
const EXPIRY_MARGIN_SECONDS: i64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Token request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Token endpoint returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

pub type TokenResult<T> = Result<T, TokenError>;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

/// A bearer token and the moment it should stop being used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    /// Full `Authorization` header value, `Bearer ...`
    pub authorization: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Expires `expires_in` seconds (900 when absent or out of range) after
    /// `now`, less a 30 second margin.
    #[must_use]
    pub fn issued(access_token: &str, expires_in: Option<i64>, now: DateTime<Utc>) -> Self {
        let expires_after = |seconds: i64| {
            TimeDelta::try_seconds(seconds.saturating_sub(EXPIRY_MARGIN_SECONDS))
                .and_then(|lifetime| now.checked_add_signed(lifetime))
        };
        let expires_at = expires_in
            .and_then(expires_after)
            .or_else(|| expires_after(DEFAULT_EXPIRES_IN))
            .unwrap_or(now);

        Self {
            authorization: format!("Bearer {access_token}"),
            expires_at,
        }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Client-credentials token source with an on-disk cache.
pub struct TokenProvider {
    http: Client,
    auth_url: String,
    client_id: String,
    client_secret: String,
    cache_path: Option<PathBuf>,
    current: RwLock<Option<AccessToken>>,
}

impl TokenProvider {
    #[must_use]
    pub fn new(http: Client, config: &ServiceTitanConfig) -> Self {
        Self {
            http,
            auth_url: config.auth_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            cache_path: Some(config.token_cache_path()),
            current: RwLock::new(None),
        }
    }

    /// Keep tokens in memory only.
    #[must_use]
    pub fn without_cache_file(mut self) -> Self {
        self.cache_path = None;
        self
    }

    /// Adopt the cached token on disk if it is still valid. Missing, corrupt
    /// or expired files are ignored.
    pub async fn load_cached(&self) -> bool {
        let Some(path) = self.cache_path.as_deref() else {
            return false;
        };

        match read_token_file(path).await {
            Ok(Some(token)) if token.is_valid_at(Utc::now()) => {
                tracing::info!("Loaded token from cache");
                *self.current.write().await = Some(token);
                true
            }
            Ok(Some(_)) => {
                tracing::info!("Cached token expired");
                false
            }
            Ok(None) => false,
            Err(e) => {
                tracing::warn!("Could not read cached token {}: {}", path.display(), e);
                false
            }
        }
    }

    /// A valid `Authorization` header value, fetching a new token if needed.
    pub async fn authorization(&self) -> TokenResult<String> {
        if let Some(token) = self.current.read().await.as_ref() {
            if token.is_valid_at(Utc::now()) {
                return Ok(token.authorization.clone());
            }
        }
        self.refresh().await
    }

    /// Fetch a new token regardless of the cached one.
    pub async fn refresh(&self) -> TokenResult<String> {
        let mut current = self.current.write().await;
        let token = self.fetch().await?;
        self.persist(&token).await;
        let authorization = token.authorization.clone();
        *current = Some(token);
        Ok(authorization)
    }

    async fn fetch(&self) -> TokenResult<AccessToken> {
        tracing::info!("Fetching new ServiceTitan token");

        let response = self
            .http
            .post(&self.auth_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Failed to fetch token: {} {}", status, body);
            return Err(TokenError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let body: TokenResponse = response.json().await?;
        Ok(AccessToken::issued(&body.access_token, body.expires_in, Utc::now()))
    }

    async fn persist(&self, token: &AccessToken) {
        let Some(path) = self.cache_path.as_deref() else {
            return;
        };
        if let Err(e) = write_token_file(path, token).await {
            tracing::warn!("Could not save token to {}: {}", path.display(), e);
        }
    }
}

async fn read_token_file(path: &Path) -> std::io::Result<Option<AccessToken>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(std::io::Error::other),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

async fn write_token_file(path: &Path, token: &AccessToken) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_vec_pretty(token).map_err(std::io::Error::other)?;
    tokio::fs::write(path, json).await
}
