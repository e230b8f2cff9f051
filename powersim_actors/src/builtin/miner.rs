//! Storage miner actor: sector lifecycle and collateral.

use super::{
    power, unhandled, ActorCode, BURNT_FUNDS_ACTOR_ADDR, INIT_ACTOR_ADDR, METHOD_CONSTRUCTOR, METHOD_SEND,
    REWARD_ACTOR_ADDR, STORAGE_POWER_ACTOR_ADDR,
};
use crate::abi::{ChainEpoch, Cid, MethodNum, RegisteredSealProof, SectorNumber, StoragePower, TokenAmount};
use crate::address::Address;
use crate::error::ActorError;
use crate::params::{MethodParams, ReturnValue};
use crate::runtime::Runtime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const PRE_COMMIT_SECTOR: MethodNum = 6;
pub const PROVE_COMMIT_SECTOR: MethodNum = 7;
pub const APPLY_REWARDS: MethodNum = 14;

pub(crate) fn method_name(method: MethodNum) -> Option<&'static str> {
    match method {
        PRE_COMMIT_SECTOR => Some("PreCommitSector"),
        PROVE_COMMIT_SECTOR => Some("ProveCommitSector"),
        APPLY_REWARDS => Some("ApplyRewards"),
        _ => None,
    }
}

// =============================================================================
// POLICY
// =============================================================================

/// Epochs between pre-commit and the earliest prove-commit.
pub const PRE_COMMIT_CHALLENGE_DELAY: ChainEpoch = 150;

/// Latest prove-commit after pre-commit.
pub const MAX_PROVE_COMMIT_DURATION: ChainEpoch = 30 * 2880 + PRE_COMMIT_CHALLENGE_DELAY;

/// Shortest allowed sector lifetime past activation.
pub const MIN_SECTOR_EXPIRATION: ChainEpoch = 180 * 2880;

pub const MAX_SECTOR_NUMBER: SectorNumber = i64::MAX as u64;

/// Deposit locked by a pre-commit. It becomes initial pledge on activation.
pub fn pre_commit_deposit(proof: RegisteredSealProof) -> TokenAmount {
    let tokens: i128 = match proof {
        RegisteredSealProof::StackedDrg2KiBV1_1 => 1,
        RegisteredSealProof::StackedDrg512MiBV1_1 => 2,
        RegisteredSealProof::StackedDrg32GiBV1_1 => 8,
        RegisteredSealProof::StackedDrg64GiBV1_1 => 16,
    };
    TokenAmount::new(tokens)
}

// =============================================================================
// STATE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinerInfo {
    /// Account that owns the miner and receives withdrawals
    pub owner: Address,
    /// Account that submits sector messages
    pub worker: Address,
    pub seal_proof_type: RegisteredSealProof,
    pub sector_size: StoragePower,
}

/// Information a miner provides when pre-committing a sector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorPreCommitInfo {
    pub seal_proof: RegisteredSealProof,
    pub sector_number: SectorNumber,
    pub sealed_cid: Cid,
    pub seal_rand_epoch: ChainEpoch,
    pub expiration: ChainEpoch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorPreCommitOnChainInfo {
    pub info: SectorPreCommitInfo,
    pub pre_commit_deposit: TokenAmount,
    pub pre_commit_epoch: ChainEpoch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorOnChainInfo {
    pub sector_number: SectorNumber,
    pub seal_proof: RegisteredSealProof,
    pub sealed_cid: Cid,
    pub activation: ChainEpoch,
    pub expiration: ChainEpoch,
    pub initial_pledge: TokenAmount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub info: MinerInfo,
    /// Total deposits held against pre-committed sectors
    pub pre_commit_deposits: TokenAmount,
    /// Sum of initial pledge of active sectors
    pub initial_pledge: TokenAmount,
    /// Block rewards received, for reporting
    pub total_rewards: TokenAmount,
    pub pre_committed_sectors: BTreeMap<SectorNumber, SectorPreCommitOnChainInfo>,
    pub sectors: BTreeMap<SectorNumber, SectorOnChainInfo>,
    pub allocated_sectors: BTreeSet<SectorNumber>,
}

impl State {
    pub fn new(info: MinerInfo) -> Self {
        Self {
            info,
            pre_commit_deposits: TokenAmount::zero(),
            initial_pledge: TokenAmount::zero(),
            total_rewards: TokenAmount::zero(),
            pre_committed_sectors: BTreeMap::new(),
            sectors: BTreeMap::new(),
            allocated_sectors: BTreeSet::new(),
        }
    }

    /// Balance not locked as pre-commit deposit or pledge.
    pub fn available_balance(&self, actor_balance: TokenAmount) -> TokenAmount {
        actor_balance - self.pre_commit_deposits - self.initial_pledge
    }

    /// Pre-commits whose challenge delay has elapsed and that can still be proven.
    pub fn provable_pre_commits(&self, epoch: ChainEpoch) -> impl Iterator<Item = &SectorPreCommitOnChainInfo> {
        self.pre_committed_sectors.values().filter(move |pc| {
            let opens = pc.pre_commit_epoch + PRE_COMMIT_CHALLENGE_DELAY;
            let closes = pc.pre_commit_epoch + MAX_PROVE_COMMIT_DURATION;
            epoch >= opens && epoch <= closes
        })
    }

    /// Raw power of all active sectors.
    pub fn active_power(&self) -> StoragePower {
        self.info.sector_size.scale(self.sectors.len() as i128)
    }
}

// =============================================================================
// PARAMS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinerConstructorParams {
    pub owner: Address,
    pub worker: Address,
    pub seal_proof_type: RegisteredSealProof,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProveCommitSectorParams {
    pub sector_number: SectorNumber,
    pub proof: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyRewardsParams {
    pub reward: TokenAmount,
    pub penalty: TokenAmount,
}

// =============================================================================
// METHODS
// =============================================================================

pub(crate) fn invoke<RT: Runtime>(
    rt: &mut RT,
    method: MethodNum,
    params: MethodParams,
) -> Result<ReturnValue, ActorError> {
    match method {
        METHOD_CONSTRUCTOR => constructor(rt, crate::expect_params!(params, MinerConstructor)),
        PRE_COMMIT_SECTOR => pre_commit_sector(rt, crate::expect_params!(params, PreCommitSector)),
        PROVE_COMMIT_SECTOR => prove_commit_sector(rt, crate::expect_params!(params, ProveCommitSector)),
        APPLY_REWARDS => apply_rewards(rt, crate::expect_params!(params, ApplyRewards)),
        _ => Err(unhandled(ActorCode::StorageMiner, method)),
    }
}

/// Owner and worker must be account actors.
fn resolve_control<RT: Runtime>(rt: &RT, address: &Address, role: &str) -> Result<Address, ActorError> {
    let resolved = rt
        .resolve_address(address)
        .ok_or_else(|| ActorError::illegal_argument(format!("unable to resolve {} address {}", role, address)))?;
    match rt.actor_code(&resolved) {
        Some(ActorCode::Account) | Some(ActorCode::Multisig) => Ok(resolved),
        other => Err(ActorError::illegal_argument(format!(
            "{} {} has code {:?}, expected an account",
            role, address, other
        ))),
    }
}

fn constructor<RT: Runtime>(rt: &mut RT, params: MinerConstructorParams) -> Result<ReturnValue, ActorError> {
    rt.validate_caller_is(&[INIT_ACTOR_ADDR])?;

    let owner = resolve_control(rt, &params.owner, "owner")?;
    let worker = resolve_control(rt, &params.worker, "worker")?;

    let info = MinerInfo {
        owner,
        worker,
        seal_proof_type: params.seal_proof_type,
        sector_size: params.seal_proof_type.sector_size(),
    };
    rt.set_state(&State::new(info))?;
    Ok(ReturnValue::None)
}

fn pre_commit_sector<RT: Runtime>(rt: &mut RT, params: SectorPreCommitInfo) -> Result<ReturnValue, ActorError> {
    let epoch = rt.epoch();
    let balance = rt.current_balance();

    rt.transaction(|st: &mut State, rt| {
        rt.validate_caller_is(&[st.info.worker, st.info.owner])?;

        if params.seal_proof != st.info.seal_proof_type {
            return Err(ActorError::illegal_argument(format!(
                "sector seal proof {} must match miner seal proof {}",
                params.seal_proof.name(),
                st.info.seal_proof_type.name()
            )));
        }
        if params.sector_number > MAX_SECTOR_NUMBER {
            return Err(ActorError::illegal_argument(format!(
                "sector number {} out of range",
                params.sector_number
            )));
        }
        if st.allocated_sectors.contains(&params.sector_number) {
            return Err(ActorError::illegal_argument(format!(
                "sector number {} already allocated",
                params.sector_number
            )));
        }
        if params.seal_rand_epoch >= epoch {
            return Err(ActorError::illegal_argument(format!(
                "seal challenge epoch {} must be before now {}",
                params.seal_rand_epoch, epoch
            )));
        }
        if params.expiration < epoch + MAX_PROVE_COMMIT_DURATION + MIN_SECTOR_EXPIRATION {
            return Err(ActorError::illegal_argument(format!(
                "sector expiration {} too early",
                params.expiration
            )));
        }

        let deposit = pre_commit_deposit(params.seal_proof);
        let available = st.available_balance(balance);
        if available < deposit {
            return Err(ActorError::insufficient_funds(format!(
                "insufficient funds for pre-commit deposit: {} < {}",
                available, deposit
            )));
        }

        st.pre_commit_deposits += deposit;
        st.allocated_sectors.insert(params.sector_number);
        st.pre_committed_sectors.insert(
            params.sector_number,
            SectorPreCommitOnChainInfo {
                info: params.clone(),
                pre_commit_deposit: deposit,
                pre_commit_epoch: epoch,
            },
        );
        Ok(())
    })?;

    Ok(ReturnValue::None)
}

fn prove_commit_sector<RT: Runtime>(rt: &mut RT, params: ProveCommitSectorParams) -> Result<ReturnValue, ActorError> {
    let epoch = rt.epoch();

    let (sector_size, pledge) = rt.transaction(|st: &mut State, rt| {
        rt.validate_caller_is(&[st.info.worker, st.info.owner])?;

        let pre_commit = st
            .pre_committed_sectors
            .get(&params.sector_number)
            .cloned()
            .ok_or_else(|| ActorError::not_found(format!("no pre-commit for sector {}", params.sector_number)))?;

        let opens = pre_commit.pre_commit_epoch + PRE_COMMIT_CHALLENGE_DELAY;
        if epoch < opens {
            return Err(ActorError::forbidden(format!(
                "too early to prove sector {}: {} < {}",
                params.sector_number, epoch, opens
            )));
        }
        if epoch > pre_commit.pre_commit_epoch + MAX_PROVE_COMMIT_DURATION {
            return Err(ActorError::illegal_argument(format!(
                "prove commit for sector {} expired",
                params.sector_number
            )));
        }
        if params.proof.is_empty() {
            return Err(ActorError::illegal_argument("empty seal proof"));
        }

        st.pre_committed_sectors.remove(&params.sector_number);
        st.pre_commit_deposits -= pre_commit.pre_commit_deposit;
        st.initial_pledge += pre_commit.pre_commit_deposit;
        st.sectors.insert(
            params.sector_number,
            SectorOnChainInfo {
                sector_number: params.sector_number,
                seal_proof: pre_commit.info.seal_proof,
                sealed_cid: pre_commit.info.sealed_cid,
                activation: epoch,
                expiration: pre_commit.info.expiration,
                initial_pledge: pre_commit.pre_commit_deposit,
            },
        );
        Ok((st.info.sector_size, pre_commit.pre_commit_deposit))
    })?;

    // Sectors without deals have quality-adjusted power equal to raw power
    rt.send(
        &STORAGE_POWER_ACTOR_ADDR,
        power::UPDATE_CLAIMED_POWER,
        MethodParams::UpdateClaimedPower(power::UpdateClaimedPowerParams {
            raw_byte_delta: sector_size,
            quality_adjusted_delta: sector_size,
        }),
        TokenAmount::zero(),
    )
    .map_err(|e| e.wrap("failed to update claimed power"))?;

    rt.send(
        &STORAGE_POWER_ACTOR_ADDR,
        power::UPDATE_PLEDGE_TOTAL,
        MethodParams::UpdatePledgeTotal(power::UpdatePledgeTotalParams { pledge_delta: pledge }),
        TokenAmount::zero(),
    )
    .map_err(|e| e.wrap("failed to update pledge total"))?;

    Ok(ReturnValue::None)
}

fn apply_rewards<RT: Runtime>(rt: &mut RT, params: ApplyRewardsParams) -> Result<ReturnValue, ActorError> {
    rt.validate_caller_is(&[REWARD_ACTOR_ADDR])?;

    if params.reward.is_negative() {
        return Err(ActorError::illegal_argument(format!("negative reward {}", params.reward)));
    }
    if params.penalty.is_negative() {
        return Err(ActorError::illegal_argument(format!("negative penalty {}", params.penalty)));
    }

    let balance = rt.current_balance();
    let burn = rt.transaction(|st: &mut State, _| {
        st.total_rewards += params.reward;
        let available = st.available_balance(balance);
        Ok(if params.penalty < available { params.penalty } else { available })
    })?;

    if burn.is_positive() {
        rt.send(&BURNT_FUNDS_ACTOR_ADDR, METHOD_SEND, MethodParams::None, burn)
            .map_err(|e| e.wrap("failed to burn penalty"))?;
    }
    Ok(ReturnValue::None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> State {
        State::new(MinerInfo {
            owner: Address::new_id(100),
            worker: Address::new_id(100),
            seal_proof_type: RegisteredSealProof::StackedDrg2KiBV1_1,
            sector_size: RegisteredSealProof::StackedDrg2KiBV1_1.sector_size(),
        })
    }

    fn pre_commit(number: SectorNumber, epoch: ChainEpoch) -> SectorPreCommitOnChainInfo {
        SectorPreCommitOnChainInfo {
            info: SectorPreCommitInfo {
                seal_proof: RegisteredSealProof::StackedDrg2KiBV1_1,
                sector_number: number,
                sealed_cid: Cid::of(&number.to_le_bytes()),
                seal_rand_epoch: epoch - 1,
                expiration: epoch + MAX_PROVE_COMMIT_DURATION + MIN_SECTOR_EXPIRATION,
            },
            pre_commit_deposit: TokenAmount::new(1),
            pre_commit_epoch: epoch,
        }
    }

    #[test]
    fn test_available_balance_excludes_locked_funds() {
        let mut st = state();
        st.pre_commit_deposits = TokenAmount::new(3);
        st.initial_pledge = TokenAmount::new(5);
        assert_eq!(st.available_balance(TokenAmount::new(100)), TokenAmount::new(92));
    }

    #[test]
    fn test_provable_window() {
        let mut st = state();
        st.pre_committed_sectors.insert(0, pre_commit(0, 10));
        st.pre_committed_sectors.insert(1, pre_commit(1, 20));

        assert_eq!(st.provable_pre_commits(159).count(), 0);
        let ready: Vec<_> = st.provable_pre_commits(160).map(|pc| pc.info.sector_number).collect();
        assert_eq!(ready, vec![0]);
        assert_eq!(st.provable_pre_commits(170).count(), 2);
        assert_eq!(st.provable_pre_commits(10 + MAX_PROVE_COMMIT_DURATION + 1).count(), 1);
    }

    #[test]
    fn test_deposit_scales_with_sector_size() {
        assert!(
            pre_commit_deposit(RegisteredSealProof::StackedDrg64GiBV1_1)
                > pre_commit_deposit(RegisteredSealProof::StackedDrg2KiBV1_1)
        );
    }
}
