//! Actor error type.

use crate::exit_code::ExitCode;
use crate::store::StoreError;
use thiserror::Error;

/// An actor method aborted with a non-success exit code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{exit_code}: {msg}")]
pub struct ActorError {
    exit_code: ExitCode,
    msg: String,
}

impl ActorError {
    pub fn new(exit_code: ExitCode, msg: impl Into<String>) -> Self {
        Self {
            exit_code,
            msg: msg.into(),
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        self.exit_code
    }

    pub fn msg(&self) -> &str {
        &self.msg
    }

    pub fn illegal_argument(msg: impl Into<String>) -> Self {
        Self::new(ExitCode::ERR_ILLEGAL_ARGUMENT, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ExitCode::ERR_NOT_FOUND, msg)
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(ExitCode::ERR_FORBIDDEN, msg)
    }

    pub fn insufficient_funds(msg: impl Into<String>) -> Self {
        Self::new(ExitCode::ERR_INSUFFICIENT_FUNDS, msg)
    }

    pub fn illegal_state(msg: impl Into<String>) -> Self {
        Self::new(ExitCode::ERR_ILLEGAL_STATE, msg)
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::new(ExitCode::ERR_SERIALIZATION, msg)
    }

    pub fn unhandled_method(msg: impl Into<String>) -> Self {
        Self::new(ExitCode::SYS_ERR_INVALID_METHOD, msg)
    }

    /// Prefixes the message with context, keeping the exit code.
    pub fn wrap(self, context: impl std::fmt::Display) -> Self {
        Self {
            exit_code: self.exit_code,
            msg: format!("{}: {}", context, self.msg),
        }
    }
}

impl From<StoreError> for ActorError {
    fn from(e: StoreError) -> Self {
        ActorError::serialization(e.to_string())
    }
}
