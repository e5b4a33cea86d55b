use pricematch_core::MatchConfig;

const DEFAULT_PORT: u16 = 5000;

#[derive(Debug, thiserror::Error)]
pub enum ServerConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),
    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Shared secret expected in the `secret` query parameter
    pub poll_secret: String,
    pub port: u16,
    /// Overrides the default match threshold
    pub threshold: Option<f64>,
}

impl ServerConfig {
    pub fn new(poll_secret: impl Into<String>) -> Self {
        Self {
            poll_secret: poll_secret.into(),
            port: DEFAULT_PORT,
            threshold: None,
        }
    }

    pub fn from_env() -> Result<Self, ServerConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ServerConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mut config = Self::new(get("POLL_SECRET").ok_or(ServerConfigError::Missing("POLL_SECRET"))?);

        if let Some(port) = get("PRICEMATCH_PORT") {
            config.port = port.trim().parse().map_err(|_| ServerConfigError::Invalid {
                name: "PRICEMATCH_PORT",
                value: port.clone(),
            })?;
        }
        if let Some(threshold) = get("PRICEMATCH_THRESHOLD") {
            let value: f64 = threshold.trim().parse().map_err(|_| ServerConfigError::Invalid {
                name: "PRICEMATCH_THRESHOLD",
                value: threshold.clone(),
            })?;
            if !(0.0..=1.0).contains(&value) {
                return Err(ServerConfigError::Invalid {
                    name: "PRICEMATCH_THRESHOLD",
                    value: threshold,
                });
            }
            config.threshold = Some(value);
        }

        Ok(config)
    }

    pub fn match_config(&self) -> MatchConfig {
        match self.threshold {
            Some(threshold) => MatchConfig::default().with_threshold(threshold),
            None => MatchConfig::default(),
        }
    }
}
