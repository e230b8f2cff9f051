//! Storage miner agent.

use crate::agent::Agent;
use crate::error::AgentError;
use crate::message::Message;
use powersim_actors::builtin::miner::{
    self, ProveCommitSectorParams, SectorPreCommitInfo, MAX_PROVE_COMMIT_DURATION, MIN_SECTOR_EXPIRATION,
};
use powersim_actors::{Address, Cid, MethodParams, RegisteredSealProof, SectorNumber, TokenAmount};
use powersim_vm::{LedgerState, LedgerStateExt};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Exp};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Tuning for a miner agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinerAgentConfig {
    /// Average pre-commits per epoch
    pub precommit_rate: f64,
    /// Proof type of every sector the miner seals
    pub proof_type: RegisteredSealProof,
    /// Funds the miner is created with
    pub starting_balance: TokenAmount,
}

impl Default for MinerAgentConfig {
    fn default() -> Self {
        Self {
            precommit_rate: 2.5,
            proof_type: RegisteredSealProof::StackedDrg32GiBV1_1,
            starting_balance: TokenAmount::zero(),
        }
    }
}

/// Operates one storage miner actor.
///
/// Each tick it proves every pre-commit whose challenge delay has elapsed
/// and issues new pre-commits as a Poisson arrival process, as long as the
/// miner's unlocked balance covers the deposit.
pub struct MinerAgent {
    pub owner: Address,
    pub worker: Address,
    pub id_address: Address,
    pub robust_address: Address,
    config: MinerAgentConfig,
    rng: ChaCha8Rng,
    precommit_interval: Exp<f64>,
    /// Arrival time of the next pre-commit, in fractional epochs
    next_precommit_at: Option<f64>,
    next_sector_number: SectorNumber,
}

impl MinerAgent {
    pub fn new(
        owner: Address,
        worker: Address,
        id_address: Address,
        robust_address: Address,
        seed: u64,
        config: MinerAgentConfig,
    ) -> Result<Self, AgentError> {
        let precommit_interval = Exp::new(config.precommit_rate)
            .map_err(|e| AgentError::InvalidConfig(format!("precommit rate {}: {}", config.precommit_rate, e)))?;
        Ok(Self {
            owner,
            worker,
            id_address,
            robust_address,
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
            precommit_interval,
            next_precommit_at: None,
            next_sector_number: 0,
        })
    }

    pub fn config(&self) -> &MinerAgentConfig {
        &self.config
    }

    /// Number of sectors this agent has pre-committed so far.
    pub fn sectors_allocated(&self) -> u64 {
        self.next_sector_number
    }

    fn prove_commit(&self, sector_number: SectorNumber) -> Message {
        let params = MethodParams::ProveCommitSector(ProveCommitSectorParams {
            sector_number,
            proof: sector_number.to_be_bytes().to_vec(),
        });
        Message::new(
            self.worker,
            self.id_address,
            TokenAmount::zero(),
            miner::PROVE_COMMIT_SECTOR,
            params,
        )
    }

    fn pre_commit(&mut self, epoch: i64) -> Message {
        let sector_number = self.next_sector_number;
        self.next_sector_number += 1;

        let sealed = format!("{}/{}", self.id_address, sector_number);
        let params = MethodParams::PreCommitSector(SectorPreCommitInfo {
            seal_proof: self.config.proof_type,
            sector_number,
            sealed_cid: Cid::of(sealed.as_bytes()),
            seal_rand_epoch: epoch - 1,
            expiration: epoch + MAX_PROVE_COMMIT_DURATION + MIN_SECTOR_EXPIRATION,
        });
        Message::new(
            self.worker,
            self.id_address,
            TokenAmount::zero(),
            miner::PRE_COMMIT_SECTOR,
            params,
        )
    }
}

impl Agent for MinerAgent {
    fn tick(&mut self, state: &dyn LedgerState) -> Result<Vec<Message>, AgentError> {
        let epoch = state.epoch();
        let st: miner::State = state.get_state(&self.id_address)?;
        let mut messages: Vec<Message> = st
            .provable_pre_commits(epoch)
            .map(|pc| self.prove_commit(pc.info.sector_number))
            .collect();
        let proofs = messages.len();

        let deposit = miner::pre_commit_deposit(self.config.proof_type);
        let mut available = st.available_balance(state.balance(&self.id_address));

        let epoch_start = epoch as f64;
        let mut next = match self.next_precommit_at {
            Some(at) => at,
            None => epoch_start + self.precommit_interval.sample(&mut self.rng),
        };
        while next < epoch_start + 1.0 {
            if available >= deposit {
                available -= deposit;
                messages.push(self.pre_commit(epoch));
            }
            next += self.precommit_interval.sample(&mut self.rng);
        }
        self.next_precommit_at = Some(next);

        if !messages.is_empty() {
            debug!(
                miner = %self.id_address,
                epoch,
                proofs,
                precommits = messages.len() - proofs,
                "miner tick"
            );
        }
        Ok(messages)
    }

    fn name(&self) -> &'static str {
        "miner"
    }

    fn miner_address(&self) -> Option<Address> {
        Some(self.id_address)
    }
}
