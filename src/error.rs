//! Error types for the lecture Q&A service.

use std::fmt;
use thiserror::Error;

/// Which remote capability a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Transcription,
    Answering,
    Synthesis,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Transcription => "transcription",
            Capability::Answering => "answering",
            Capability::Synthesis => "speech synthesis",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum AgentError {
    /// The referenced query audio does not exist in the object store.
    #[error("object not found")]
    ObjectNotFound { key: String },

    /// Non-success response or timeout from a capability.
    #[error("{capability} unavailable: {message}")]
    CapabilityUnavailable {
        capability: Capability,
        message: String,
    },

    #[error("malformed request: {message}")]
    MalformedRequest { message: String },

    #[error("persistence failure: {message}")]
    PersistenceFailure { message: String },

    #[error("invalid configuration: {message}")]
    Config { message: String },
}

impl AgentError {
    pub fn malformed(message: impl Into<String>) -> Self {
        AgentError::MalformedRequest {
            message: message.into(),
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        AgentError::PersistenceFailure {
            message: message.into(),
        }
    }

    pub fn unavailable(capability: Capability, message: impl Into<String>) -> Self {
        AgentError::CapabilityUnavailable {
            capability,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;

/// Errors raised by the audio object store and the session store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("no object stored under {key}")]
    NotFound { key: String },

    #[error("invalid storage key: {key}")]
    InvalidKey { key: String },

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by the capability adapters.
#[derive(Error, Debug)]
pub enum CapabilityError {
    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}
