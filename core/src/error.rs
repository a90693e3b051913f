//! Error types for the ReportPortal client.
//!
//! # Design
//! There are two failure kinds on the wire: the request never completed
//! (`Transport`) or it completed with a status other than the one the
//! operation accepts (`UnexpectedStatus`). The Display text of
//! `UnexpectedStatus` is exactly `failed with status <status line>`; callers
//! match on that text, so it must not change.

use thiserror::Error;

use crate::http::HttpMethod;

/// Failure reported by a `Transport` while executing a request.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Http(#[from] ureq::Error),

    /// Failure from a custom transport that has no richer error type.
    #[error("{0}")]
    Other(String),
}

/// Errors returned by `Client` and `Launch` operations.
#[derive(Debug, Error)]
pub enum RpError {
    /// The request could not be built or sent.
    #[error("failed to execute {method} request {url}")]
    Transport {
        method: HttpMethod,
        url: String,
        #[source]
        source: TransportError,
    },

    /// The server answered with a status the operation does not accept.
    #[error("failed with status {line}")]
    UnexpectedStatus {
        status: u16,
        line: String,
        body: String,
    },

    #[error("can't encode request body for {url}")]
    Serialize {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("can't decode response from {url}")]
    Deserialize {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// A lifecycle operation other than start was called before the launch
    /// received an id from the server.
    #[error("launch has not been started")]
    LaunchNotStarted,

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl RpError {
    /// The HTTP status code, for `UnexpectedStatus` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            RpError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RpError>;
