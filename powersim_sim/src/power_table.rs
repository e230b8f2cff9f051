//! Per-epoch snapshot of consensus power.

use crate::agent::Agent;
use crate::error::SimError;
use powersim_actors::builtin::{power, reward, REWARD_ACTOR_ADDR, STORAGE_POWER_ACTOR_ADDR};
use powersim_actors::{Address, StoragePower, TokenAmount};
use powersim_vm::{LedgerState, LedgerStateExt};
use serde::Serialize;

/// One miner's entry in the power table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MinerPower {
    pub address: Address,
    pub qa_power: StoragePower,
}

/// Consensus power observed before an epoch's messages are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PowerTable {
    /// Reward for the full expected set of block producers this epoch
    pub block_reward: TokenAmount,
    /// Quality-adjusted power the network uses for leader election
    pub total_qa_power: StoragePower,
    /// Eligible miners, in agent order
    pub miners: Vec<MinerPower>,
}

impl PowerTable {
    /// Sum of the listed miners' power.
    pub fn listed_power(&self) -> StoragePower {
        self.miners.iter().map(|m| m.qa_power).sum()
    }
}

/// Builds the power table from current ledger state.
///
/// A miner agent is listed when the power actor holds a claim for its miner
/// and that claim meets the consensus minimum.
///
/// The total is the power actor's consensus total
/// ([`power::State::current_total_power`]), not `total_quality_adj_power`.
/// While fewer than four miners meet their proof type's minimum, it counts all
/// committed power. A network of 32GiB or 64GiB miners below the minimum
/// therefore still has a positive total and pays block rewards.
pub fn compute_power_table(state: &dyn LedgerState, agents: &[Box<dyn Agent>]) -> Result<PowerTable, SimError> {
    let rst: reward::State = state
        .get_state(&REWARD_ACTOR_ADDR)
        .map_err(|e| SimError::state_read(REWARD_ACTOR_ADDR, e))?;
    let pst: power::State = state
        .get_state(&STORAGE_POWER_ACTOR_ADDR)
        .map_err(|e| SimError::state_read(STORAGE_POWER_ACTOR_ADDR, e))?;

    let (_, total_qa_power) = pst.current_total_power();
    let mut table = PowerTable {
        block_reward: rst.this_epoch_reward,
        total_qa_power,
        miners: Vec::new(),
    };

    for address in agents.iter().filter_map(|a| a.miner_address()) {
        let claim = pst
            .get_claim(state.store(), &address)
            .map_err(|e| SimError::state_read(address, e))?;
        let Some(claim) = claim else {
            continue;
        };
        let eligible = pst
            .miner_nominal_power_meets_consensus_minimum(state.store(), &address)
            .map_err(|e| SimError::state_read(address, e))?;
        if eligible {
            table.miners.push(MinerPower {
                address,
                qa_power: claim.quality_adj_power,
            });
        }
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use crate::message::Message;
    use powersim_vm::{Ledger, Vm};

    struct FixedMiner(Address);

    impl Agent for FixedMiner {
        fn tick(&mut self, _state: &dyn LedgerState) -> Result<Vec<Message>, AgentError> {
            Ok(Vec::new())
        }

        fn name(&self) -> &'static str {
            "fixed_miner"
        }

        fn miner_address(&self) -> Option<Address> {
            Some(self.0)
        }
    }

    #[test]
    fn test_genesis_table_is_empty() {
        let vm = Vm::new().unwrap();
        let table = compute_power_table(&vm, &[]).unwrap();
        assert!(table.miners.is_empty());
        assert!(table.total_qa_power.is_zero());
        assert_eq!(table.block_reward, TokenAmount::new(1_000_000));
    }

    #[test]
    fn test_unknown_miner_is_skipped() {
        let vm = Vm::new().unwrap();
        let agents: Vec<Box<dyn Agent>> = vec![Box::new(FixedMiner(Address::new_id(1234)))];
        let table = compute_power_table(&vm, &agents).unwrap();
        assert!(table.miners.is_empty());
    }

    #[test]
    fn test_miner_without_power_is_not_listed() {
        let mut vm = Vm::new().unwrap();
        let owner = vm.create_accounts(1, TokenAmount::new(100), 1).unwrap()[0];
        let params = powersim_actors::MethodParams::CreateMiner(power::CreateMinerParams {
            owner,
            worker: owner,
            seal_proof_type: powersim_actors::RegisteredSealProof::StackedDrg32GiBV1_1,
        });
        let (ret, code) = vm.apply_message(
            &owner,
            &STORAGE_POWER_ACTOR_ADDR,
            TokenAmount::new(100),
            power::CREATE_MINER,
            params,
        );
        assert!(code.is_success());
        let miner = match ret {
            powersim_actors::ReturnValue::CreateMiner(r) => r.id_address,
            other => panic!("unexpected return {:?}", other),
        };

        let agents: Vec<Box<dyn Agent>> = vec![Box::new(FixedMiner(miner))];
        let table = compute_power_table(&vm, &agents).unwrap();
        // Claim exists but holds no power below the minimum miner count
        assert!(table.miners.is_empty());
    }
}
