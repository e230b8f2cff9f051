//! PowerSim VM - ledger state interface and in-memory ledger
//!
//! This crate provides the boundary between the simulation engine and the
//! ledger it drives:
//! - [`LedgerState`]: read-only view (epoch, actors, store)
//! - [`Ledger`]: message application, diagnostics and epoch advance
//!
//! [`Vm`] is the in-memory implementation. Its state tree is copied on
//! every epoch advance while the content-addressed block store is shared,
//! so handles from earlier epochs stay valid for inspection.
//!
//! # Example
//!
//! ```ignore
//! use powersim_vm::{Ledger, Vm};
//!
//! let mut vm = Vm::new()?;
//! let accounts = vm.create_accounts(3, TokenAmount::new(1000), 42)?;
//! let (ret, code) = vm.apply_message(&accounts[0], &accounts[1], TokenAmount::new(10), METHOD_SEND, MethodParams::None);
//! let next = vm.with_epoch(vm.epoch() + 1)?;
//! ```

mod error;
mod keys;
mod ledger;
mod state;
mod stats;
mod store;
mod vm;

pub use error::LedgerError;
pub use keys::DeterministicKeyProvider;
pub use ledger::Ledger;
pub use state::{ActorSnapshot, LedgerState, LedgerStateExt};
pub use stats::{CallStatistics, CallStats, MethodCallSummary, MethodKey};
pub use store::MemoryBlockstore;
pub use vm::{Vm, FAUCET_SUPPLY, MAX_CALL_DEPTH, NETWORK_NAME};
