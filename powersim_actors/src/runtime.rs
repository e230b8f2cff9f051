//! The interface actor code executes against.

use crate::abi::{ChainEpoch, MethodNum, TokenAmount};
use crate::address::Address;
use crate::builtin::ActorCode;
use crate::error::ActorError;
use crate::params::{MethodParams, ReturnValue};
use crate::store::Blockstore;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Execution context of one actor method invocation.
///
/// # Implementations
///
/// - **Ledger**: `powersim_vm::Vm` provides one per (nested) send, with
///   rollback of the state tree if the invocation fails.
///
/// All addresses returned by the runtime are ID addresses.
pub trait Runtime {
    /// Current epoch of the ledger.
    fn epoch(&self) -> ChainEpoch;

    /// ID address of the immediate caller.
    fn caller(&self) -> Address;

    /// Code of the immediate caller.
    fn caller_code(&self) -> Option<ActorCode>;

    /// ID address of the actor being invoked.
    fn receiver(&self) -> Address;

    /// Value transferred along with this invocation.
    fn value_received(&self) -> TokenAmount;

    /// Balance of the receiver, including the value received.
    fn current_balance(&self) -> TokenAmount;

    /// Content-addressed store backing all actor state.
    fn store(&self) -> &dyn Blockstore;

    /// Loads the receiver's state object.
    fn state<S: DeserializeOwned>(&mut self) -> Result<S, ActorError>;

    /// Replaces the receiver's state object.
    fn set_state<S: Serialize>(&mut self, state: &S) -> Result<(), ActorError>;

    /// Sends a message to another actor. A failing send leaves state as it
    /// was before the send; the caller decides whether to propagate.
    fn send(
        &mut self,
        to: &Address,
        method: MethodNum,
        params: MethodParams,
        value: TokenAmount,
    ) -> Result<ReturnValue, ActorError>;

    /// Resolves any address to its ID address.
    fn resolve_address(&self, address: &Address) -> Option<Address>;

    /// Code of the actor at `address`, if it exists.
    fn actor_code(&self, address: &Address) -> Option<ActorCode>;

    /// Allocates a fresh robust address for an actor about to be created.
    fn new_actor_address(&mut self) -> Address;

    /// Creates an actor with empty state at an unused ID address.
    /// Reserved for the init actor.
    fn create_actor(&mut self, code: ActorCode, address: &Address) -> Result<(), ActorError>;

    /// Appends a line to the ledger's diagnostic log.
    fn log(&mut self, message: String);

    /// Loads, mutates and stores the receiver's state in one step.
    fn transaction<S, R, F>(&mut self, f: F) -> Result<R, ActorError>
    where
        Self: Sized,
        S: Serialize + DeserializeOwned,
        F: FnOnce(&mut S, &mut Self) -> Result<R, ActorError>,
    {
        let mut st: S = self.state()?;
        let result = f(&mut st, self)?;
        self.set_state(&st)?;
        Ok(result)
    }

    /// Fails unless the caller is one of `allowed`.
    fn validate_caller_is(&self, allowed: &[Address]) -> Result<(), ActorError> {
        let caller = self.caller();
        if allowed.contains(&caller) {
            return Ok(());
        }
        Err(ActorError::new(
            crate::exit_code::ExitCode::SYS_ERR_FORBIDDEN,
            format!("caller {} is not one of {:?}", caller, allowed),
        ))
    }

    /// Fails unless the caller's code is one of `allowed`.
    fn validate_caller_type(&self, allowed: &[ActorCode]) -> Result<(), ActorError> {
        match self.caller_code() {
            Some(code) if allowed.contains(&code) => Ok(()),
            other => Err(ActorError::new(
                crate::exit_code::ExitCode::SYS_ERR_FORBIDDEN,
                format!("caller type {:?} is not one of {:?}", other, allowed),
            )),
        }
    }
}
