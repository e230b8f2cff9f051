//! System actor: origin of implicit messages (cron ticks, block rewards).

use super::{unhandled, ActorCode};
use crate::abi::MethodNum;
use crate::error::ActorError;
use crate::params::{MethodParams, ReturnValue};
use crate::runtime::Runtime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {}

pub(crate) fn invoke<RT: Runtime>(
    _rt: &mut RT,
    method: MethodNum,
    _params: MethodParams,
) -> Result<ReturnValue, ActorError> {
    Err(unhandled(ActorCode::System, method))
}
