//! Cron actor: runs registered end-of-epoch entries.

use super::{unhandled, ActorCode, SYSTEM_ACTOR_ADDR};
use crate::abi::{MethodNum, TokenAmount};
use crate::address::Address;
use crate::error::ActorError;
use crate::params::{MethodParams, ReturnValue};
use crate::runtime::Runtime;
use serde::{Deserialize, Serialize};

pub const EPOCH_TICK: MethodNum = 2;

pub(crate) fn method_name(method: MethodNum) -> Option<&'static str> {
    match method {
        EPOCH_TICK => Some("EpochTick"),
        _ => None,
    }
}

/// A method invoked on every epoch tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub receiver: Address,
    pub method_num: MethodNum,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub entries: Vec<Entry>,
}

impl State {
    /// The genesis cron table: the power actor's end-of-epoch handler.
    pub fn genesis() -> Self {
        Self {
            entries: vec![Entry {
                receiver: super::STORAGE_POWER_ACTOR_ADDR,
                method_num: super::power::ON_EPOCH_TICK_END,
            }],
        }
    }
}

pub(crate) fn invoke<RT: Runtime>(
    rt: &mut RT,
    method: MethodNum,
    _params: MethodParams,
) -> Result<ReturnValue, ActorError> {
    match method {
        EPOCH_TICK => epoch_tick(rt),
        _ => Err(unhandled(ActorCode::Cron, method)),
    }
}

fn epoch_tick<RT: Runtime>(rt: &mut RT) -> Result<ReturnValue, ActorError> {
    rt.validate_caller_is(&[SYSTEM_ACTOR_ADDR])?;

    let st: State = rt.state()?;
    for entry in &st.entries {
        // A failing entry must not prevent the others from running
        if let Err(e) = rt.send(&entry.receiver, entry.method_num, MethodParams::None, TokenAmount::zero()) {
            rt.log(format!(
                "cron entry {}:{} failed: {}",
                entry.receiver, entry.method_num, e
            ));
        }
    }
    Ok(ReturnValue::None)
}
