//! Result codes of applying a message.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome indicator returned by applying a message to the ledger.
///
/// Codes below [`ExitCode::FIRST_ACTOR_ERROR`] are raised by the VM itself,
/// codes at or above it by actor code.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExitCode(u32);

impl ExitCode {
    pub const OK: ExitCode = ExitCode(0);

    // System errors
    pub const SYS_ERR_SENDER_INVALID: ExitCode = ExitCode(1);
    pub const SYS_ERR_SENDER_STATE_INVALID: ExitCode = ExitCode(2);
    pub const SYS_ERR_INVALID_METHOD: ExitCode = ExitCode(3);
    pub const SYS_ERR_RESERVED1: ExitCode = ExitCode(4);
    pub const SYS_ERR_INVALID_RECEIVER: ExitCode = ExitCode(5);
    pub const SYS_ERR_INSUFFICIENT_FUNDS: ExitCode = ExitCode(6);
    pub const SYS_ERR_OUT_OF_GAS: ExitCode = ExitCode(7);
    pub const SYS_ERR_FORBIDDEN: ExitCode = ExitCode(8);
    pub const SYS_ERR_ILLEGAL_ACTOR: ExitCode = ExitCode(9);
    pub const SYS_ERR_ILLEGAL_ARGUMENT: ExitCode = ExitCode(10);
    pub const SYS_ERR_SERIALIZATION: ExitCode = ExitCode(11);

    pub const FIRST_ACTOR_ERROR: ExitCode = ExitCode(16);

    // Actor errors
    pub const ERR_ILLEGAL_ARGUMENT: ExitCode = ExitCode(16);
    pub const ERR_NOT_FOUND: ExitCode = ExitCode(17);
    pub const ERR_FORBIDDEN: ExitCode = ExitCode(18);
    pub const ERR_INSUFFICIENT_FUNDS: ExitCode = ExitCode(19);
    pub const ERR_ILLEGAL_STATE: ExitCode = ExitCode(20);
    pub const ERR_SERIALIZATION: ExitCode = ExitCode(21);

    pub const fn new(code: u32) -> Self {
        ExitCode(code)
    }

    pub const fn value(&self) -> u32 {
        self.0
    }

    pub fn is_success(&self) -> bool {
        self.0 == 0
    }

    pub fn is_system_error(&self) -> bool {
        self.0 != 0 && self.0 < Self::FIRST_ACTOR_ERROR.0
    }

    fn name(&self) -> Option<&'static str> {
        let name = match self.0 {
            0 => "Ok",
            1 => "SysErrSenderInvalid",
            2 => "SysErrSenderStateInvalid",
            3 => "SysErrInvalidMethod",
            4 => "SysErrReserved1",
            5 => "SysErrInvalidReceiver",
            6 => "SysErrInsufficientFunds",
            7 => "SysErrOutOfGas",
            8 => "SysErrForbidden",
            9 => "SysErrIllegalActor",
            10 => "SysErrIllegalArgument",
            11 => "SysErrSerialization",
            16 => "ErrIllegalArgument",
            17 => "ErrNotFound",
            18 => "ErrForbidden",
            19 => "ErrInsufficientFunds",
            20 => "ErrIllegalState",
            21 => "ErrSerialization",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}({})", name, self.0),
            None => write!(f, "{}", self.0),
        }
    }
}

impl fmt::Debug for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(ExitCode::OK.is_success());
        assert!(ExitCode::SYS_ERR_INSUFFICIENT_FUNDS.is_system_error());
        assert!(!ExitCode::ERR_FORBIDDEN.is_system_error());
        assert_eq!(ExitCode::ERR_NOT_FOUND.to_string(), "ErrNotFound(17)");
        assert_eq!(ExitCode::new(99).to_string(), "99");
    }
}
