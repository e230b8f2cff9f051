//! Read-only view of ledger state.

use crate::error::LedgerError;
use powersim_actors::{ActorCode, Address, Blockstore, BlockstoreExt, ChainEpoch, Cid, TokenAmount};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// An actor's entry in the state tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorSnapshot {
    /// Which state machine the actor runs
    pub code: ActorCode,
    /// CID of the actor's state object
    pub head: Cid,
    pub balance: TokenAmount,
    /// Number of top-level messages this actor has sent
    pub call_seq: u64,
}

/// Read access to the ledger at one epoch.
///
/// Agents and return handlers receive this as `&dyn LedgerState`, so the
/// trait stays object safe; typed reads live on [`LedgerStateExt`].
pub trait LedgerState {
    /// The epoch this handle executes at.
    fn epoch(&self) -> ChainEpoch;

    /// Looks up an actor by any address. Key and actor addresses are
    /// resolved through the init actor.
    fn actor(&self, address: &Address) -> Option<ActorSnapshot>;

    /// Resolves an address to the ID address of an existing actor.
    fn resolve_address(&self, address: &Address) -> Option<Address>;

    /// The content-addressed store holding all actor state.
    fn store(&self) -> &dyn Blockstore;

    /// Balance of an actor; zero if it does not exist.
    fn balance(&self, address: &Address) -> TokenAmount {
        self.actor(address).map(|a| a.balance).unwrap_or_default()
    }
}

/// Typed state access on top of any [`LedgerState`].
pub trait LedgerStateExt: LedgerState {
    /// Loads and decodes an actor's state object.
    fn get_state<T: DeserializeOwned>(&self, address: &Address) -> Result<T, LedgerError> {
        let actor = self.actor(address).ok_or(LedgerError::NotFound(*address))?;
        self.store()
            .get_obj::<T>(&actor.head)
            .map_err(|e| LedgerError::decode(*address, e))?
            .ok_or_else(|| LedgerError::decode(*address, format!("head {} missing from store", actor.head)))
    }
}

impl<L: LedgerState + ?Sized> LedgerStateExt for L {}
