use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_AUTH_URL: &str = "https://auth-integration.servicetitan.io/connect/token";
pub const DEFAULT_API_URL: &str = "https://api-integration.servicetitan.io";

/// Credentials, endpoints and limits for the ServiceTitan integration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceTitanConfig {
    pub tenant_id: String,
    pub app_key: String,
    pub client_id: String,
    #[serde(skip_serializing)]
    pub client_secret: String,
    /// OAuth client-credentials token endpoint
    pub auth_url: String,
    /// API root, without a trailing slash
    pub api_url: String,
    /// Materials fetched per pricebook page
    pub page_size: u32,
    /// Stop paging once this many materials are held
    pub max_items: Option<usize>,
    /// Form submissions requested per cycle
    pub forms_page_size: u32,
    /// How long a fetched catalog stays fresh
    pub catalog_ttl_seconds: u64,
    pub connect_timeout_seconds: u32,
    pub request_timeout_seconds: u32,
    /// Token cache and processed-forms files live here
    pub state_dir: PathBuf,
}

impl ServiceTitanConfig {
    #[must_use]
    pub fn new(
        tenant_id: impl Into<String>,
        app_key: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            app_key: app_key.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            page_size: 500,
            max_items: None,
            forms_page_size: 10,
            catalog_ttl_seconds: 3600,
            connect_timeout_seconds: 30,
            request_timeout_seconds: 120,
            state_dir: default_state_dir(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any name -> value lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let mut config = Self::new(
            required("SERVICETITAN_TENANT_ID")?,
            required("SERVICETITAN_APP_KEY")?,
            required("CLIENT_ID")?,
            required("CLIENT_SECRET")?,
        );

        if let Some(url) = get("SERVICETITAN_AUTH_URL") {
            config.auth_url = url;
        }
        if let Some(url) = get("SERVICETITAN_API_URL") {
            config.api_url = url.trim_end_matches('/').to_string();
        }
        if let Some(value) = get("PRICEBOOK_PAGE_SIZE") {
            config.page_size = parse_number("PRICEBOOK_PAGE_SIZE", &value)?;
        }
        if let Some(value) = get("PRICEBOOK_MAX_ITEMS") {
            config.max_items = Some(parse_number("PRICEBOOK_MAX_ITEMS", &value)?);
        }
        if let Some(value) = get("PRICEBOOK_CACHE_SECONDS") {
            config.catalog_ttl_seconds = parse_number("PRICEBOOK_CACHE_SECONDS", &value)?;
        }
        if let Some(dir) = get("PRICEMATCH_STATE_DIR") {
            config.state_dir = PathBuf::from(dir);
        }

        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = url.into();
        self
    }

    #[must_use]
    pub fn with_state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::Invalid {
                name: "PRICEBOOK_PAGE_SIZE",
                value: "0".to_string(),
            });
        }
        for (name, value) in [("auth_url", &self.auth_url), ("api_url", &self.api_url)] {
            url::Url::parse(value).map_err(|_| ConfigError::Invalid {
                name,
                value: value.clone(),
            })?;
        }
        Ok(())
    }

    pub fn catalog_ttl(&self) -> Duration {
        Duration::from_secs(self.catalog_ttl_seconds)
    }

    pub fn token_cache_path(&self) -> PathBuf {
        self.state_dir.join("token_cache.json")
    }

    pub fn processed_forms_path(&self) -> PathBuf {
        self.state_dir.join("processed_forms.json")
    }

    /// `{api}/{service}/v2/tenant/{tenant}/{path}`
    pub fn endpoint(&self, service: &str, path: &str) -> String {
        format!(
            "{}/{}/v2/tenant/{}/{}",
            self.api_url,
            service,
            self.tenant_id,
            path.trim_start_matches('/')
        )
    }
}

fn default_state_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pricematch")
}

fn parse_number<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value: value.to_string(),
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),
    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    const REQUIRED: [(&str, &str); 4] = [
        ("SERVICETITAN_TENANT_ID", "12345"),
        ("SERVICETITAN_APP_KEY", "ak1.test"),
        ("CLIENT_ID", "cid.test"),
        ("CLIENT_SECRET", "cs1.test"),
    ];

    #[test]
    fn test_defaults() {
        let config = ServiceTitanConfig::from_lookup(lookup(&REQUIRED)).unwrap();

        assert_eq!(config.tenant_id, "12345");
        assert_eq!(config.page_size, 500);
        assert_eq!(config.max_items, None);
        assert_eq!(config.catalog_ttl(), Duration::from_secs(3600));
        assert_eq!(config.auth_url, DEFAULT_AUTH_URL);
        assert!(config.state_dir.ends_with("pricematch"));
    }

    #[test]
    fn test_missing_required() {
        let err = ServiceTitanConfig::from_lookup(lookup(&REQUIRED[..3])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("CLIENT_SECRET")));

        let mut blank = REQUIRED.to_vec();
        blank[0] = ("SERVICETITAN_TENANT_ID", "  ");
        let err = ServiceTitanConfig::from_lookup(lookup(&blank)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("SERVICETITAN_TENANT_ID")));
    }

    #[test]
    fn test_overrides() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("SERVICETITAN_API_URL", "http://127.0.0.1:9000/"),
            ("PRICEBOOK_PAGE_SIZE", "50"),
            ("PRICEBOOK_MAX_ITEMS", "500"),
            ("PRICEBOOK_CACHE_SECONDS", "60"),
            ("PRICEMATCH_STATE_DIR", "/tmp/pricematch-test"),
        ]);
        let config = ServiceTitanConfig::from_lookup(lookup(&vars)).unwrap();

        assert_eq!(config.api_url, "http://127.0.0.1:9000");
        assert_eq!(config.page_size, 50);
        assert_eq!(config.max_items, Some(500));
        assert_eq!(config.catalog_ttl_seconds, 60);
        assert_eq!(
            config.processed_forms_path(),
            PathBuf::from("/tmp/pricematch-test/processed_forms.json")
        );
    }

    #[test]
    fn test_invalid_numbers() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("PRICEBOOK_PAGE_SIZE", "lots"));
        assert!(matches!(
            ServiceTitanConfig::from_lookup(lookup(&vars)),
            Err(ConfigError::Invalid { name: "PRICEBOOK_PAGE_SIZE", .. })
        ));

        let mut vars = REQUIRED.to_vec();
        vars.push(("PRICEBOOK_PAGE_SIZE", "0"));
        assert!(ServiceTitanConfig::from_lookup(lookup(&vars)).is_err());
    }

    #[test]
    fn test_endpoint() {
        let config = ServiceTitanConfig::new("42", "app", "id", "secret")
            .with_api_url("https://api.example.com/");
        assert_eq!(
            config.endpoint("pricebook", "/materials"),
            "https://api.example.com/pricebook/v2/tenant/42/materials"
        );
    }

    #[test]
    fn test_secret_not_serialized() {
        let config = ServiceTitanConfig::new("42", "app", "id", "hunter2");
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("hunter2"));
    }
}
