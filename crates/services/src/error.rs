//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::model::{QuestionId, TestModelError};
use remote::RemoteError;

use crate::sessions::SessionState;

/// Errors emitted by the session controller.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("cannot {action} while session is {state}")]
    InvalidTransition {
        action: &'static str,
        state: SessionState,
    },
    #[error("question {0} is not part of the loaded test")]
    UnknownQuestion(QuestionId),
    #[error("no question at position {0}")]
    OutOfRange(usize),
    #[error("nothing answered yet")]
    NothingAnswered,
    #[error("session was exited while the call was in flight")]
    Superseded,
    #[error("session state lock poisoned")]
    Poisoned,
    #[error(transparent)]
    Model(#[from] TestModelError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// Errors emitted while reading session configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid {key}: {value}")]
    Invalid { key: &'static str, value: String },
}
