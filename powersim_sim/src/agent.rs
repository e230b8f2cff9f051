//! The agent abstraction.

use crate::error::AgentError;
use crate::message::Message;
use powersim_actors::Address;
use powersim_vm::LedgerState;

/// An autonomous participant that proposes messages each epoch.
///
/// # Implementations
///
/// - **Miner**: [`crate::MinerAgent`] commits sectors and can win blocks.
/// - **Account**: [`crate::AccountAgent`] transfers funds between peers.
///
/// `tick` must derive its messages only from the ledger view and the
/// agent's own random stream. Agents never mutate the ledger directly.
pub trait Agent {
    /// Produces this epoch's messages.
    fn tick(&mut self, state: &dyn LedgerState) -> Result<Vec<Message>, AgentError>;

    /// Short name for logs and errors.
    fn name(&self) -> &'static str;

    /// ID address of the storage miner this agent operates, if any.
    /// Agents returning an address take part in block reward distribution.
    fn miner_address(&self) -> Option<Address> {
        None
    }
}
