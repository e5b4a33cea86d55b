use thiserror::Error;

use crate::matching::MatchConfigError;
use crate::poller::PollError;
use crate::servicetitan::{ClientError, ConfigError, TokenError};
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid match configuration: {0}")]
    MatchConfig(#[from] MatchConfigError),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("API error: {0}")]
    Client(#[from] ClientError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Polling failed: {0}")]
    Poll(#[from] PollError),
}

pub type Result<T> = std::result::Result<T, Error>;
