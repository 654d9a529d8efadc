use derive_more::derive::Display;
use serde::{Deserialize, Serialize};

use crate::Speaker;

/// Classifies why a call to the model backend did not produce a completion.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendErrorKind {
    #[display("transport")]
    Transport,
    #[display("timeout")]
    Timeout,
    #[display("http status {_0}")]
    Status(u16),
    #[display("malformed response")]
    MalformedResponse,
    #[display("missing credential")]
    MissingCredential,
}

/// A failed backend call. Carried as a value so that callers decide whether
/// to abort, retry or record the failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl ToString) -> Self {
        Self { kind, message: message.to_string() }
    }

    pub fn transport(message: impl ToString) -> Self {
        Self::new(BackendErrorKind::Transport, message)
    }

    pub fn timeout(message: impl ToString) -> Self {
        Self::new(BackendErrorKind::Timeout, message)
    }

    pub fn status(code: u16, message: impl ToString) -> Self {
        Self::new(BackendErrorKind::Status(code), message)
    }

    pub fn malformed(message: impl ToString) -> Self {
        Self::new(BackendErrorKind::MalformedResponse, message)
    }

    pub fn missing_credential(message: impl ToString) -> Self {
        Self::new(BackendErrorKind::MissingCredential, message)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Malformed scenario '{scenario}': {reason}")]
    MalformedScenario { scenario: String, reason: String },

    #[error("Scenario '{0}' contains no candidate turns")]
    EmptyScenario(String),

    #[error("Scenario id '{0}' is used by more than one scenario in the batch")]
    DuplicateScenario(String),

    #[error("Conversation '{0}' already has history; reset the store before running it again")]
    ConversationInProgress(String),

    #[error("Backend failure: {0}")]
    Backend(#[from] BackendError),

    #[error("Temperature must be between 0.0 and 2.0, got {0}")]
    InvalidTemperature(f32),

    #[error("Out-of-order turn in conversation '{key}': expected {expected}, got {actual}")]
    OutOfOrderTurn {
        key: String,
        expected: Speaker,
        actual: Speaker,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
