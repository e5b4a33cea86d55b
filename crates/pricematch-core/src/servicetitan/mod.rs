//! ServiceTitan API plumbing: configuration, OAuth tokens, the REST client
//! and the form payloads the poller reads.

mod client;
mod config;
mod forms;
mod token;

pub use client::{ClientError, ClientResult, ServiceTitanClient};
pub use config::{ConfigError, ServiceTitanConfig, DEFAULT_API_URL, DEFAULT_AUTH_URL};
pub use forms::{FormOwner, FormSubmission, FormUnit, JobRecord, Page};
pub use token::{AccessToken, TokenError, TokenProvider, TokenResult};
