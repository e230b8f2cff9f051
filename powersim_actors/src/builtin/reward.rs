//! Reward actor: holds the mining supply and pays block rewards.

use super::{
    miner, unhandled, ActorCode, BURNT_FUNDS_ACTOR_ADDR, EXPECTED_LEADERS_PER_EPOCH, METHOD_SEND,
    STORAGE_POWER_ACTOR_ADDR, SYSTEM_ACTOR_ADDR,
};
use crate::abi::{ChainEpoch, MethodNum, StoragePower, TokenAmount};
use crate::address::Address;
use crate::error::ActorError;
use crate::params::{MethodParams, ReturnValue};
use crate::runtime::Runtime;
use serde::{Deserialize, Serialize};

pub const AWARD_BLOCK_REWARD: MethodNum = 2;
pub const THIS_EPOCH_REWARD: MethodNum = 3;
pub const UPDATE_NETWORK_KPI: MethodNum = 4;

pub(crate) fn method_name(method: MethodNum) -> Option<&'static str> {
    match method {
        AWARD_BLOCK_REWARD => Some("AwardBlockReward"),
        THIS_EPOCH_REWARD => Some("ThisEpochReward"),
        UPDATE_NETWORK_KPI => Some("UpdateNetworkKPI"),
        _ => None,
    }
}

/// Tokens held by the reward actor at genesis.
pub const GENESIS_REWARD_SUPPLY: TokenAmount = TokenAmount::new(1_000_000_000_000);

/// Each epoch releases `1 / REWARD_DECAY_DIVISOR` of the remaining supply.
pub const REWARD_DECAY_DIVISOR: i128 = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// Reward for the full expected set of block producers this epoch
    pub this_epoch_reward: TokenAmount,
    /// Total block reward paid out so far
    pub total_mined: TokenAmount,
    /// Epochs elapsed since genesis, advanced by the power actor's KPI update
    pub effective_network_time: ChainEpoch,
    /// Raw power the network reported at the last KPI update
    pub network_raw_power: StoragePower,
}

impl State {
    pub fn new(supply: TokenAmount) -> Self {
        Self {
            this_epoch_reward: epoch_reward(supply),
            total_mined: TokenAmount::zero(),
            effective_network_time: 0,
            network_raw_power: StoragePower::zero(),
        }
    }
}

fn epoch_reward(remaining: TokenAmount) -> TokenAmount {
    remaining.div_floor(REWARD_DECAY_DIVISOR)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwardBlockRewardParams {
    pub miner: Address,
    pub penalty: TokenAmount,
    pub gas_reward: TokenAmount,
    pub win_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThisEpochRewardReturn {
    pub this_epoch_reward: TokenAmount,
}

pub(crate) fn invoke<RT: Runtime>(
    rt: &mut RT,
    method: MethodNum,
    params: MethodParams,
) -> Result<ReturnValue, ActorError> {
    match method {
        AWARD_BLOCK_REWARD => award_block_reward(rt, crate::expect_params!(params, AwardBlockReward)),
        THIS_EPOCH_REWARD => {
            let st: State = rt.state()?;
            Ok(ReturnValue::ThisEpochReward(ThisEpochRewardReturn {
                this_epoch_reward: st.this_epoch_reward,
            }))
        }
        UPDATE_NETWORK_KPI => update_network_kpi(rt, crate::expect_params!(params, UpdateNetworkKpi)),
        _ => Err(unhandled(ActorCode::Reward, method)),
    }
}

/// Pays `this_epoch_reward * win_count / E` plus the gas reward to a miner.
///
/// The payment is capped at the actor's balance. If the miner refuses the
/// payment the funds are burnt instead.
fn award_block_reward<RT: Runtime>(rt: &mut RT, params: AwardBlockRewardParams) -> Result<ReturnValue, ActorError> {
    rt.validate_caller_is(&[SYSTEM_ACTOR_ADDR])?;

    if params.penalty.is_negative() {
        return Err(ActorError::illegal_argument(format!("negative penalty {}", params.penalty)));
    }
    if params.gas_reward.is_negative() {
        return Err(ActorError::illegal_argument(format!("negative gas reward {}", params.gas_reward)));
    }
    if params.win_count <= 0 {
        return Err(ActorError::illegal_argument(format!("invalid win count {}", params.win_count)));
    }

    let balance = rt.current_balance();
    if balance < params.gas_reward {
        return Err(ActorError::illegal_state(format!(
            "actor balance {} below gas reward {}",
            balance, params.gas_reward
        )));
    }

    let miner = rt
        .resolve_address(&params.miner)
        .ok_or_else(|| ActorError::not_found(format!("failed to resolve miner {}", params.miner)))?;

    let block_reward = rt.transaction(|st: &mut State, _| {
        let mut block_reward = st
            .this_epoch_reward
            .scale(params.win_count as i128)
            .div_floor(EXPECTED_LEADERS_PER_EPOCH);
        let available = balance - params.gas_reward;
        if block_reward > available {
            block_reward = available;
        }
        st.total_mined += block_reward;
        Ok(block_reward)
    })?;

    let total = block_reward + params.gas_reward;
    let apply = MethodParams::ApplyRewards(miner::ApplyRewardsParams {
        reward: total,
        penalty: params.penalty,
    });
    if let Err(e) = rt.send(&miner, miner::APPLY_REWARDS, apply, total) {
        rt.log(format!("failed to send ApplyRewards to {}: {}; burning reward", miner, e));
        rt.send(&BURNT_FUNDS_ACTOR_ADDR, METHOD_SEND, MethodParams::None, total)
            .map_err(|e| e.wrap("failed to burn unclaimed reward"))?;
    }

    Ok(ReturnValue::None)
}

/// Called by the power actor at the end of every epoch.
fn update_network_kpi<RT: Runtime>(rt: &mut RT, raw_power: Option<StoragePower>) -> Result<ReturnValue, ActorError> {
    rt.validate_caller_is(&[STORAGE_POWER_ACTOR_ADDR])?;

    let balance = rt.current_balance();
    rt.transaction(|st: &mut State, _| {
        st.effective_network_time += 1;
        st.network_raw_power = raw_power.unwrap_or_default();
        st.this_epoch_reward = epoch_reward(balance);
        Ok(())
    })?;
    Ok(ReturnValue::None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genesis_reward_is_fraction_of_supply() {
        let st = State::new(GENESIS_REWARD_SUPPLY);
        assert_eq!(st.this_epoch_reward, TokenAmount::new(1_000_000));
        assert!(st.total_mined.is_zero());
    }
}
