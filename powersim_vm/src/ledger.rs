//! The ledger contract the simulation engine drives.

use crate::error::LedgerError;
use crate::state::LedgerState;
use crate::stats::CallStatistics;
use powersim_actors::{Address, ChainEpoch, ExitCode, MethodNum, MethodParams, ReturnValue, TokenAmount};

/// A ledger that applies messages and advances epochs.
///
/// # Implementations
///
/// - **In-memory**: [`crate::Vm`] executes the builtin actors directly.
///
/// Handles are values: [`Ledger::with_epoch`] returns a new handle and the
/// old one stays valid.
pub trait Ledger: LedgerState + Sized {
    /// Applies one top-level message.
    ///
    /// A non-OK exit code leaves the state tree exactly as it was before
    /// the message; the failure is appended to [`Ledger::logs`].
    fn apply_message(
        &mut self,
        from: &Address,
        to: &Address,
        value: TokenAmount,
        method: MethodNum,
        params: MethodParams,
    ) -> (ReturnValue, ExitCode);

    /// Diagnostic log accumulated by this handle.
    fn logs(&self) -> Vec<String>;

    /// Call statistics accumulated by this handle.
    fn call_stats(&self) -> CallStatistics;

    /// Returns a new handle at `epoch` with the same state, fresh statistics
    /// and an empty log.
    fn with_epoch(&self, epoch: ChainEpoch) -> Result<Self, LedgerError>;

    /// Creates `count` accounts funded with `balance` each. Keys are derived
    /// from `seed`. Returns the accounts' ID addresses.
    fn create_accounts(&mut self, count: usize, balance: TokenAmount, seed: u64) -> Result<Vec<Address>, LedgerError>;
}
