//! Error types surfaced by the runtime.

use thiserror::Error;

/// An inbound native event did not match its declared decoder.
///
/// Decode failures are recovered locally: the event is dropped and no
/// message is dispatched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("missing field `{0}`")]
    MissingField(String),

    #[error("expected {expected}, found {found}")]
    Expected {
        expected: &'static str,
        found: &'static str,
    },

    #[error("{0}")]
    Failure(String),
}

impl DecodeError {
    /// A free-form decode failure.
    pub fn failure(message: impl Into<String>) -> Self {
        DecodeError::Failure(message.into())
    }
}

/// Misuse of the [`Runtime`](crate::Runtime) lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("runtime has already been started")]
    AlreadyStarted,

    #[error("runtime has not been started")]
    NotStarted,

    #[error("runtime has been stopped")]
    Stopped,
}
