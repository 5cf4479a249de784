use reqwest::StatusCode;
use thiserror::Error;

/// Failure talking to the support backend.
///
/// The underlying `reqwest` error is kept as the source so callers can log the
/// full detail; nothing here is meant to be shown to the user verbatim.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request to backend failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("could not decode backend response: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("request ended without a reply: {0}")]
    Aborted(String),
}

impl BackendError {
    pub fn is_timeout(&self) -> bool {
        match self {
            BackendError::Transport(e) | BackendError::Decode(e) => e.is_timeout(),
            BackendError::Status { .. } | BackendError::Aborted(_) => false,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            BackendError::Status { status, .. } => Some(*status),
            BackendError::Transport(e) | BackendError::Decode(e) => e.status(),
            BackendError::Aborted(_) => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversationError {
    #[error("a message is already being answered")]
    RequestInFlight,
}
