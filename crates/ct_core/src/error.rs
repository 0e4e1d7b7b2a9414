use thiserror::Error;

/// Normalized request failure. Every outbound HTTP call resolves to either
/// its payload or one of these variants; the raw transport error never
/// crosses the client boundary.
///
/// The taxonomy is cloneable so a single failed in-flight request can be
/// broadcast to every deduplicated waiter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RequestError {
    /// The request could not be constructed or sent at all.
    #[error("Error setting up the request")]
    Setup,

    /// The request went out but nothing came back (offline, DNS failure).
    #[error("No response received from the server")]
    NoResponse,

    /// The configured deadline elapsed before a response arrived.
    #[error("Request timed out")]
    Timeout,

    /// The caller cancelled the request.
    #[error("Request aborted")]
    Aborted,

    /// A response arrived with a non-2xx status.
    #[error("Request failed with status: {status}")]
    Http {
        status: u16,
        /// Whatever body the server sent along, kept for diagnostics.
        data: serde_json::Value,
    },
}

impl RequestError {
    /// Status code, when the server actually answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Similarity error: {0}")]
    Similarity(String),
}
