use thiserror::Error;

use crate::recordio::RecordIoError;

#[derive(Debug, Error)]
/// Errors surfaced by the driver, its transports and its configuration loaders.
pub enum MesosError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("mesos returned non-success status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("event stream framing error: {0}")]
    RecordIo(#[from] RecordIoError),
    #[error("{call} call requires a framework id; subscribe first")]
    NotSubscribed { call: &'static str },
    #[error("subscribe gave up after {attempts} attempts: {last_error}")]
    SubscribeExhausted { attempts: usize, last_error: String },
    #[error("operation cancelled by shutdown")]
    Cancelled,
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl MesosError {
    /// Returns true when repeating the subscribe call could succeed. Any
    /// transport or status failure qualifies, since a 4xx from a non-leading
    /// master clears once the leader is elected.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_)
            | Self::HttpStatus { .. }
            | Self::InvalidResponse(_)
            | Self::RecordIo(_) => true,
            Self::Serde(_)
            | Self::NotSubscribed { .. }
            | Self::SubscribeExhausted { .. }
            | Self::Cancelled
            | Self::Config(_) => false,
        }
    }
}
