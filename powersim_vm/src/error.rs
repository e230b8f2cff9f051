//! Error types for the ledger interface.

use powersim_actors::{Address, ChainEpoch, StoreError};
use thiserror::Error;

/// Errors raised by ledger reads and ledger lifecycle operations.
///
/// Message execution failures are not errors at this level; they are
/// reported as exit codes by [`crate::Ledger::apply_message`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// No actor exists at the address
    #[error("Actor not found: {0}")]
    NotFound(Address),

    /// Actor state could not be decoded as the requested type
    #[error("Failed to decode state of {address}: {reason}")]
    Decode { address: Address, reason: String },

    /// Block store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The requested epoch transition is not allowed
    #[error("Cannot advance ledger from epoch {from} to {to}")]
    Epoch { from: ChainEpoch, to: ChainEpoch },

    /// Funding or creating accounts failed
    #[error("Account creation failed: {0}")]
    AccountCreation(String),
}

impl LedgerError {
    /// Creates a decode error.
    pub fn decode(address: Address, reason: impl std::fmt::Display) -> Self {
        Self::Decode {
            address,
            reason: reason.to_string(),
        }
    }
}
