//! Error types for catalog-worker.
//!
//! Everything except `Decode`, `Config` and sink failures is job-local:
//! the job executor turns it into a code=1 result item and the process
//! keeps going.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The request envelope could not be decoded. Fatal at startup.
    #[error("error decoding request: {0}")]
    Decode(String),

    /// The projection expression failed to compile or evaluate.
    #[error("filter error: {0}")]
    Filter(String),

    #[error("Artifacts is greater than {limit} bytes")]
    SizeExceeded { size: usize, limit: usize },

    #[error("Invalid method received {0}")]
    UnsupportedMethod(String),

    /// Non-2xx response. `body` is the raw response body.
    #[error("HTTP {method} call failed with {status}")]
    Http {
        method: &'static str,
        status: u16,
        body: String,
    },

    #[error("Object does not contain a status attribute")]
    MissingStatus,

    #[error("Status: {0} is not one of the known status")]
    UnknownStatus(String),

    #[error("invalid url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("result channel closed")]
    ChannelClosed,

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// HTTP status to report alongside this error; 0 when no response was involved.
    pub fn status(&self) -> u16 {
        match self {
            Error::Http { status, .. } => *status,
            _ => 0,
        }
    }

    /// Human-readable text carried in the body of a failed result item.
    ///
    /// HTTP failures relay the remote body verbatim so the requester sees
    /// what the API said.
    pub fn diagnostic(&self) -> String {
        match self {
            Error::Http { body, .. } => body.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
