//! Init actor: allocates ID addresses and creates non-singleton actors.

use super::{unhandled, ActorCode, FIRST_NON_SINGLETON_ACTOR_ID, METHOD_CONSTRUCTOR, STORAGE_POWER_ACTOR_ADDR};
use crate::abi::MethodNum;
use crate::address::Address;
use crate::error::ActorError;
use crate::params::{MethodParams, ReturnValue};
use crate::runtime::Runtime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const EXEC: MethodNum = 2;

pub(crate) fn method_name(method: MethodNum) -> Option<&'static str> {
    match method {
        EXEC => Some("Exec"),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// Robust (key or actor) address to ID
    pub address_map: BTreeMap<Address, u64>,
    pub next_id: u64,
    pub network_name: String,
}

impl State {
    pub fn new(network_name: impl Into<String>) -> Self {
        Self {
            address_map: BTreeMap::new(),
            next_id: FIRST_NON_SINGLETON_ACTOR_ID,
            network_name: network_name.into(),
        }
    }

    /// Assigns the next ID to a robust address and returns the ID address.
    pub fn map_address_to_new_id(&mut self, address: &Address) -> Address {
        let id = self.next_id;
        self.next_id += 1;
        self.address_map.insert(*address, id);
        Address::new_id(id)
    }

    /// Resolves an address to an ID address. ID addresses resolve to themselves.
    pub fn resolve_address(&self, address: &Address) -> Option<Address> {
        if address.is_id() {
            return Some(*address);
        }
        self.address_map.get(address).map(|id| Address::new_id(*id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecParams {
    pub code: ActorCode,
    pub constructor_params: Box<MethodParams>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecReturn {
    /// The canonical ID-based address for the actor
    pub id_address: Address,
    /// A more expensive but re-org-safe address for the newly created actor
    pub robust_address: Address,
}

pub(crate) fn invoke<RT: Runtime>(
    rt: &mut RT,
    method: MethodNum,
    params: MethodParams,
) -> Result<ReturnValue, ActorError> {
    match method {
        EXEC => exec(rt, crate::expect_params!(params, Exec)),
        _ => Err(unhandled(ActorCode::Init, method)),
    }
}

/// Only the power actor may create miners; singletons are never created here.
fn can_exec(caller: Option<ActorCode>, caller_addr: &Address, code: ActorCode) -> bool {
    match code {
        ActorCode::StorageMiner => {
            caller == Some(ActorCode::StoragePower) && *caller_addr == STORAGE_POWER_ACTOR_ADDR
        }
        ActorCode::Multisig => true,
        _ => false,
    }
}

fn exec<RT: Runtime>(rt: &mut RT, params: ExecParams) -> Result<ReturnValue, ActorError> {
    if !can_exec(rt.caller_code(), &rt.caller(), params.code) {
        return Err(ActorError::forbidden(format!(
            "caller {} may not create actors of type {}",
            rt.caller(),
            params.code
        )));
    }

    let robust_address = rt.new_actor_address();
    let id_address = rt.transaction(|st: &mut State, _| Ok(st.map_address_to_new_id(&robust_address)))?;

    rt.create_actor(params.code, &id_address)?;
    let value = rt.value_received();
    rt.send(&id_address, METHOD_CONSTRUCTOR, *params.constructor_params, value)
        .map_err(|e| e.wrap(format!("constructor of {} failed", params.code)))?;

    Ok(ReturnValue::Exec(ExecReturn {
        id_address,
        robust_address,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_start_after_singletons() {
        let mut st = State::new("test");
        let a = Address::new_key(b"a");
        let b = Address::new_key(b"b");
        assert_eq!(st.map_address_to_new_id(&a), Address::new_id(100));
        assert_eq!(st.map_address_to_new_id(&b), Address::new_id(101));
        assert_eq!(st.resolve_address(&b), Some(Address::new_id(101)));
        assert_eq!(st.resolve_address(&Address::new_id(7)), Some(Address::new_id(7)));
        assert_eq!(st.resolve_address(&Address::new_key(b"c")), None);
    }
}
