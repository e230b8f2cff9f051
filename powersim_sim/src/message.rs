//! Pending messages produced during a tick.

use crate::agent::Agent;
use crate::error::AgentError;
use powersim_actors::{Address, MethodNum, MethodParams, ReturnValue, TokenAmount};
use powersim_vm::LedgerState;
use serde::Serialize;
use std::fmt;

/// Callback run after a message applies successfully.
///
/// Receives the ledger with the message applied, the message and its
/// return value. May hand back a new agent, which the engine appends to
/// its agent set.
pub type ReturnHandler =
    Box<dyn FnOnce(&dyn LedgerState, &Message, &ReturnValue) -> Result<Option<Box<dyn Agent>>, AgentError>>;

/// A state-transition request waiting to be applied.
pub struct Message {
    pub from: Address,
    pub to: Address,
    pub value: TokenAmount,
    pub method: MethodNum,
    pub params: MethodParams,
    pub return_handler: Option<ReturnHandler>,
}

impl Message {
    pub fn new(from: Address, to: Address, value: TokenAmount, method: MethodNum, params: MethodParams) -> Self {
        Self {
            from,
            to,
            value,
            method,
            params,
            return_handler: None,
        }
    }

    /// Attaches a return handler.
    pub fn with_return_handler<F>(mut self, handler: F) -> Self
    where
        F: FnOnce(&dyn LedgerState, &Message, &ReturnValue) -> Result<Option<Box<dyn Agent>>, AgentError> + 'static,
    {
        self.return_handler = Some(Box::new(handler));
        self
    }

    /// A plain, cloneable description of the message.
    pub fn summary(&self) -> MessageSummary {
        MessageSummary {
            from: self.from,
            to: self.to,
            value: self.value,
            method: self.method,
            params: self.params.clone(),
        }
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("value", &self.value)
            .field("method", &self.method)
            .field("params", &self.params)
            .field("return_handler", &self.return_handler.is_some())
            .finish()
    }
}

/// Message as recorded in tick reports and errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageSummary {
    pub from: Address,
    pub to: Address,
    pub value: TokenAmount,
    pub method: MethodNum,
    pub params: MethodParams,
}

impl fmt::Display for MessageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} method {} value {} ({})",
            self.from,
            self.to,
            self.method,
            self.value,
            self.params.kind()
        )
    }
}
