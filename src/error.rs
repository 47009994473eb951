//! Unified error types.

use crate::domain::series::ConvertError;
use crate::schema::ValidationError;
use std::fmt;
use thiserror::Error;

/// Top-level error for the high-level client and the proxy binary.
#[derive(Error, Debug)]
pub enum SdkError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

// ─── Fetch errors ────────────────────────────────────────────────────────────

/// Which stage of an upstream fetch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchErrorKind {
    /// Non-2xx response, or an error status block in a 2xx body.
    Upstream,
    /// Connection failure, timeout, or an interrupted body.
    Transport,
    /// The body did not satisfy the payload contract.
    Shape,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchErrorKind::Upstream => write!(f, "Upstream"),
            FetchErrorKind::Transport => write!(f, "Transport"),
            FetchErrorKind::Shape => write!(f, "Shape"),
        }
    }
}

/// A failed fetch, carried as a value.
///
/// `Clone` so one failure can be handed to every caller waiting on the same
/// fingerprint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} error: {detail}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub detail: String,
}

impl FetchError {
    pub fn upstream(detail: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Upstream,
            detail: detail.into(),
        }
    }

    pub fn transport(detail: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Transport,
            detail: detail.into(),
        }
    }

    pub fn shape(detail: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Shape,
            detail: detail.into(),
        }
    }
}

impl From<ValidationError> for FetchError {
    fn from(e: ValidationError) -> Self {
        FetchError::shape(e.to_string())
    }
}

impl From<ConvertError> for FetchError {
    fn from(e: ConvertError) -> Self {
        FetchError::shape(e.to_string())
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            FetchError::shape(e.to_string())
        } else if e.is_timeout() {
            FetchError::transport(format!("Request timed out: {}", e))
        } else {
            FetchError::transport(e.to_string())
        }
    }
}

// ─── Live channel errors ─────────────────────────────────────────────────────

/// Live-channel errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// Terminal for the current connection lifecycle; `connect()` starts a new one.
    #[error("Max reconnect attempts exceeded after {attempts} attempts")]
    MaxRetriesExceeded { attempts: u32 },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Protocol error: {0}")]
    ProtocolError(String),
}
