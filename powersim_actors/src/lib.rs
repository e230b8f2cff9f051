//! PowerSim Actors - on-chain ABI and builtin actor state machines
//!
//! This library holds everything a ledger needs in order to execute
//! state-transition requests:
//! 1. **ABI**: addresses, token amounts, storage power, exit codes, CIDs
//! 2. **Runtime**: the trait an actor executes against (state, sends, balances)
//! 3. **Builtin actors**: system, init, cron, account, reward, storage power,
//!    storage miner and multisig
//!
//! Actor state is stored in a content-addressed [`Blockstore`]; an actor's
//! head is the CID of its encoded state object.

pub mod abi;
pub mod address;
pub mod builtin;
pub mod error;
pub mod exit_code;
pub mod params;
pub mod runtime;
pub mod store;

mod serde_str;

// Re-export key types for convenience
pub use abi::{ChainEpoch, Cid, MethodNum, RegisteredSealProof, SectorNumber, StoragePower, TokenAmount};
pub use address::Address;
pub use builtin::ActorCode;
pub use error::ActorError;
pub use exit_code::ExitCode;
pub use params::{MethodParams, ReturnValue};
pub use runtime::Runtime;
pub use store::{Blockstore, BlockstoreExt, StoreError};
