//! Indexden Client Library
//!
//! HTTP client for the hosted Indexden search API.

mod client;
pub mod transport;
pub mod uri;

pub use client::Client;
pub use indexden_core::*;
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport};
pub use uri::UriBuilder;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("Failed to encode request body: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Server error: {status} - {message}")]
    Server { status: u16, message: String },

    #[error("Failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),
}

/// Which side of the exchange an error comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected locally, nothing was sent
    Configuration,
    /// Network failure, timeout or non-2xx status
    Transport,
    /// The service answered with a shape the client did not expect
    Decoding,
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::InvalidUrl(_)
            | ClientError::Validation(_)
            | ClientError::Serialization(_) => ErrorKind::Configuration,
            ClientError::Request(_) | ClientError::Server { .. } => ErrorKind::Transport,
            ClientError::Decode(_) | ClientError::InvalidResponse(_) => ErrorKind::Decoding,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
