//! Builtin actors, singleton addresses and method dispatch.

pub mod account;
pub mod cron;
pub mod init;
pub mod miner;
pub mod multisig;
pub mod power;
pub mod reward;
pub mod system;

use crate::abi::MethodNum;
use crate::address::Address;
use crate::error::ActorError;
use crate::params::{MethodParams, ReturnValue};
use crate::runtime::Runtime;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

// =============================================================================
// SINGLETONS
// =============================================================================

pub const SYSTEM_ACTOR_ADDR: Address = Address::new_id(0);
pub const INIT_ACTOR_ADDR: Address = Address::new_id(1);
pub const REWARD_ACTOR_ADDR: Address = Address::new_id(2);
pub const CRON_ACTOR_ADDR: Address = Address::new_id(3);
pub const STORAGE_POWER_ACTOR_ADDR: Address = Address::new_id(4);
pub const BURNT_FUNDS_ACTOR_ADDR: Address = Address::new_id(99);

/// First ID handed out by the init actor.
pub const FIRST_NON_SINGLETON_ACTOR_ID: u64 = 100;

/// Plain value transfer, understood by every actor.
pub const METHOD_SEND: MethodNum = 0;
pub const METHOD_CONSTRUCTOR: MethodNum = 1;

/// Expected number of block producers per epoch across the network.
pub const EXPECTED_LEADERS_PER_EPOCH: i128 = 5;

// =============================================================================
// ACTOR CODES
// =============================================================================

/// Identifies which state machine an actor runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActorCode {
    System,
    Init,
    Cron,
    Account,
    Reward,
    StoragePower,
    StorageMiner,
    Multisig,
}

impl ActorCode {
    pub fn name(&self) -> &'static str {
        match self {
            ActorCode::System => "system",
            ActorCode::Init => "init",
            ActorCode::Cron => "cron",
            ActorCode::Account => "account",
            ActorCode::Reward => "reward",
            ActorCode::StoragePower => "storagepower",
            ActorCode::StorageMiner => "storageminer",
            ActorCode::Multisig => "multisig",
        }
    }

    /// Singleton actors are created at genesis and never through init.
    pub fn is_singleton(&self) -> bool {
        matches!(
            self,
            ActorCode::System | ActorCode::Init | ActorCode::Cron | ActorCode::Reward | ActorCode::StoragePower
        )
    }

    /// Human-readable method name, for call statistics.
    pub fn method_name(&self, method: MethodNum) -> &'static str {
        if method == METHOD_SEND {
            return "Send";
        }
        if method == METHOD_CONSTRUCTOR {
            return "Constructor";
        }
        let name = match self {
            ActorCode::System => None,
            ActorCode::Init => init::method_name(method),
            ActorCode::Cron => cron::method_name(method),
            ActorCode::Account => account::method_name(method),
            ActorCode::Reward => reward::method_name(method),
            ActorCode::StoragePower => power::method_name(method),
            ActorCode::StorageMiner => miner::method_name(method),
            ActorCode::Multisig => multisig::method_name(method),
        };
        name.unwrap_or("Unknown")
    }
}

impl fmt::Display for ActorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fil/2/{}", self.name())
    }
}

/// Dispatches a method invocation to the actor implementation for `code`.
///
/// Method 0 never reaches this function; value transfers are handled by
/// the ledger before dispatch.
pub fn invoke<RT: Runtime>(
    rt: &mut RT,
    code: ActorCode,
    method: MethodNum,
    params: MethodParams,
) -> Result<ReturnValue, ActorError> {
    trace!(actor = code.name(), method = code.method_name(method), "invoke");
    match code {
        ActorCode::System => system::invoke(rt, method, params),
        ActorCode::Init => init::invoke(rt, method, params),
        ActorCode::Cron => cron::invoke(rt, method, params),
        ActorCode::Account => account::invoke(rt, method, params),
        ActorCode::Reward => reward::invoke(rt, method, params),
        ActorCode::StoragePower => power::invoke(rt, method, params),
        ActorCode::StorageMiner => miner::invoke(rt, method, params),
        ActorCode::Multisig => multisig::invoke(rt, method, params),
    }
}

fn unhandled(code: ActorCode, method: MethodNum) -> ActorError {
    ActorError::unhandled_method(format!("{} has no method {}", code, method))
}
