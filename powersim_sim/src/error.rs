//! Error types for the simulation engine.

use crate::message::MessageSummary;
use powersim_actors::{Address, ExitCode};
use powersim_vm::LedgerError;
use std::fmt;
use thiserror::Error;

/// Errors raised by an agent while producing messages or handling a return.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Reading ledger state failed
    #[error("Ledger read failed: {0}")]
    Ledger(#[from] LedgerError),

    /// A method returned a value of the wrong shape
    #[error("Unexpected return value: expected {expected}, got {got}")]
    UnexpectedReturn { expected: &'static str, got: String },

    /// Agent configuration is unusable
    #[error("Invalid agent configuration: {0}")]
    InvalidConfig(String),
}

/// Where in a tick a message was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickPhase {
    /// Shuffled agent batch, with the message's position in applied order
    Batch { position: usize },
    /// Block reward distribution
    Reward,
    /// End-of-epoch cron tick
    Cron,
}

impl fmt::Display for TickPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TickPhase::Batch { position } => write!(f, "batch message #{}", position),
            TickPhase::Reward => write!(f, "reward message"),
            TickPhase::Cron => write!(f, "cron message"),
        }
    }
}

/// Errors that abort a simulation tick.
///
/// None of these are retried: every message submitted by the engine is
/// expected to succeed, so a failure indicates a defect in actor code or
/// in an agent.
#[derive(Debug, Error)]
pub enum SimError {
    /// Ledger bootstrap or account creation failed
    #[error("Initialization failed: {0}")]
    Initialization(#[source] LedgerError),

    /// Required actor state is missing or undecodable
    #[error("Failed to read state of {address}: {reason}")]
    StateRead { address: Address, reason: String },

    /// An agent or a return handler failed
    #[error("Agent {agent} failed: {source}")]
    Agent {
        agent: String,
        #[source]
        source: AgentError,
    },

    /// A message returned a non-success exit code
    #[error("exitcode {code}: {phase} failed: {message}\n{}", .log.join("\n"))]
    Execution {
        code: ExitCode,
        phase: TickPhase,
        message: Box<MessageSummary>,
        log: Vec<String>,
    },

    /// The ledger refused to move to the next epoch
    #[error("Epoch advance failed: {0}")]
    EpochAdvance(#[source] LedgerError),
}

impl SimError {
    /// Creates a state read error.
    pub fn state_read(address: Address, reason: impl fmt::Display) -> Self {
        Self::StateRead {
            address,
            reason: reason.to_string(),
        }
    }

    /// The exit code of a failed message, if this is an execution error.
    pub fn exit_code(&self) -> Option<ExitCode> {
        match self {
            SimError::Execution { code, .. } => Some(*code),
            _ => None,
        }
    }
}
