//! Provider failures.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeocodeError {
    /// Quota exhausted; `reset` is when the provider accepts requests again.
    #[error("Rate limited (reset: {reset:?})")]
    RateLimited { reset: Option<DateTime<Utc>> },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Request failed: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    Payload(String),
}
