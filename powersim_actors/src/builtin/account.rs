//! Account actor: holds funds for a key address.

use super::{unhandled, ActorCode, METHOD_CONSTRUCTOR, SYSTEM_ACTOR_ADDR};
use crate::abi::MethodNum;
use crate::address::Address;
use crate::error::ActorError;
use crate::params::{MethodParams, ReturnValue};
use crate::runtime::Runtime;
use serde::{Deserialize, Serialize};

pub const PUBKEY_ADDRESS: MethodNum = 2;

pub(crate) fn method_name(method: MethodNum) -> Option<&'static str> {
    match method {
        PUBKEY_ADDRESS => Some("PubkeyAddress"),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// The key address this account was created for
    pub address: Address,
}

pub(crate) fn invoke<RT: Runtime>(
    rt: &mut RT,
    method: MethodNum,
    params: MethodParams,
) -> Result<ReturnValue, ActorError> {
    match method {
        METHOD_CONSTRUCTOR => {
            rt.validate_caller_is(&[SYSTEM_ACTOR_ADDR])?;
            let address = crate::expect_params!(params, AccountConstructor);
            if !address.is_key() {
                return Err(ActorError::illegal_argument(format!(
                    "account must be constructed with a key address, got {}",
                    address
                )));
            }
            rt.set_state(&State { address })?;
            Ok(ReturnValue::None)
        }
        PUBKEY_ADDRESS => {
            let st: State = rt.state()?;
            Ok(ReturnValue::PubkeyAddress(st.address))
        }
        _ => Err(unhandled(ActorCode::Account, method)),
    }
}
