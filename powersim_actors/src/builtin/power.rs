//! Storage power actor: registers miners and accounts for consensus power.
//!
//! Miner claims live in the blockstore behind the `claims` root so that a
//! claim lookup goes through the store, like any other on-chain collection.

use super::{
    init, miner, reward, unhandled, ActorCode, CRON_ACTOR_ADDR, INIT_ACTOR_ADDR, REWARD_ACTOR_ADDR,
};
use crate::abi::{Cid, MethodNum, RegisteredSealProof, StoragePower, TokenAmount};
use crate::address::Address;
use crate::error::ActorError;
use crate::params::{MethodParams, ReturnValue};
use crate::runtime::Runtime;
use crate::store::{Blockstore, BlockstoreExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const CREATE_MINER: MethodNum = 2;
pub const UPDATE_CLAIMED_POWER: MethodNum = 3;
pub const ON_EPOCH_TICK_END: MethodNum = 5;
pub const UPDATE_PLEDGE_TOTAL: MethodNum = 6;

pub(crate) fn method_name(method: MethodNum) -> Option<&'static str> {
    match method {
        CREATE_MINER => Some("CreateMiner"),
        UPDATE_CLAIMED_POWER => Some("UpdateClaimedPower"),
        ON_EPOCH_TICK_END => Some("OnEpochTickEnd"),
        UPDATE_PLEDGE_TOTAL => Some("UpdatePledgeTotal"),
        _ => None,
    }
}

/// Below this many miners meeting the minimum, any miner with power is eligible.
pub const CONSENSUS_MINER_MIN_MINERS: i64 = 4;

type ClaimMap = BTreeMap<Address, Claim>;

/// Power claimed by one miner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Miner's proof type, which determines its minimum power
    pub seal_proof_type: RegisteredSealProof,
    /// Sum of raw byte power for a miner's sectors
    pub raw_byte_power: StoragePower,
    /// Sum of quality adjusted power for a miner's sectors
    pub quality_adj_power: StoragePower,
}

impl Claim {
    fn meets_minimum(&self) -> bool {
        self.raw_byte_power >= self.seal_proof_type.consensus_miner_min_power()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// Raw power of miners meeting the consensus minimum
    pub total_raw_byte_power: StoragePower,
    /// Raw power committed by all miners
    pub total_bytes_committed: StoragePower,
    /// Quality-adjusted power of miners meeting the consensus minimum
    pub total_quality_adj_power: StoragePower,
    /// Quality-adjusted power committed by all miners
    pub total_qa_bytes_committed: StoragePower,
    pub total_pledge_collateral: TokenAmount,
    pub miner_count: i64,
    /// Number of miners whose raw power meets the consensus minimum
    pub miner_above_min_power_count: i64,
    /// Root of the claim map
    pub claims: Cid,
}

impl State {
    /// Creates an empty power table, writing the empty claim map to `store`.
    pub fn new(store: &dyn Blockstore) -> Result<Self, ActorError> {
        let claims = store.put_obj(&ClaimMap::new())?;
        Ok(Self {
            total_raw_byte_power: StoragePower::zero(),
            total_bytes_committed: StoragePower::zero(),
            total_quality_adj_power: StoragePower::zero(),
            total_qa_bytes_committed: StoragePower::zero(),
            total_pledge_collateral: TokenAmount::zero(),
            miner_count: 0,
            miner_above_min_power_count: 0,
            claims,
        })
    }

    /// Network power used for consensus: the above-minimum totals once enough
    /// miners meet the minimum, otherwise everything committed.
    pub fn current_total_power(&self) -> (StoragePower, StoragePower) {
        if self.miner_above_min_power_count < CONSENSUS_MINER_MIN_MINERS {
            (self.total_bytes_committed, self.total_qa_bytes_committed)
        } else {
            (self.total_raw_byte_power, self.total_quality_adj_power)
        }
    }

    fn load_claims(&self, store: &dyn Blockstore) -> Result<ClaimMap, ActorError> {
        store
            .get_obj::<ClaimMap>(&self.claims)?
            .ok_or_else(|| ActorError::illegal_state(format!("claim map {} missing from store", self.claims)))
    }

    /// Looks up a miner's claim.
    pub fn get_claim(&self, store: &dyn Blockstore, miner: &Address) -> Result<Option<Claim>, ActorError> {
        Ok(self.load_claims(store)?.remove(miner))
    }

    /// Whether a miner's raw power makes it eligible to win blocks.
    pub fn miner_nominal_power_meets_consensus_minimum(
        &self,
        store: &dyn Blockstore,
        miner: &Address,
    ) -> Result<bool, ActorError> {
        let claim = self
            .get_claim(store, miner)?
            .ok_or_else(|| ActorError::not_found(format!("no claim for actor {}", miner)))?;

        if claim.meets_minimum() {
            return Ok(true);
        }
        if self.miner_above_min_power_count >= CONSENSUS_MINER_MIN_MINERS {
            return Ok(false);
        }
        Ok(claim.raw_byte_power.is_positive())
    }

    /// Writes a claim, keeping totals and the above-minimum count consistent.
    fn set_claim(&mut self, store: &dyn Blockstore, miner: &Address, claim: Claim) -> Result<(), ActorError> {
        let mut claims = self.load_claims(store)?;
        let old = claims.get(miner).cloned();

        if let Some(old) = &old {
            self.total_bytes_committed -= old.raw_byte_power;
            self.total_qa_bytes_committed -= old.quality_adj_power;
            if old.meets_minimum() {
                self.total_raw_byte_power -= old.raw_byte_power;
                self.total_quality_adj_power -= old.quality_adj_power;
                self.miner_above_min_power_count -= 1;
            }
        }

        self.total_bytes_committed += claim.raw_byte_power;
        self.total_qa_bytes_committed += claim.quality_adj_power;
        if claim.meets_minimum() {
            self.total_raw_byte_power += claim.raw_byte_power;
            self.total_quality_adj_power += claim.quality_adj_power;
            self.miner_above_min_power_count += 1;
        }

        if claim.raw_byte_power.is_negative() || claim.quality_adj_power.is_negative() {
            return Err(ActorError::illegal_state(format!(
                "negative claimed power for {}: raw {}, qa {}",
                miner, claim.raw_byte_power, claim.quality_adj_power
            )));
        }

        claims.insert(*miner, claim);
        self.claims = store.put_obj(&claims)?;
        Ok(())
    }

    fn add_to_claim(
        &mut self,
        store: &dyn Blockstore,
        miner: &Address,
        raw_delta: StoragePower,
        qa_delta: StoragePower,
    ) -> Result<(), ActorError> {
        let mut claim = self
            .get_claim(store, miner)?
            .ok_or_else(|| ActorError::not_found(format!("no claim for actor {}", miner)))?;
        claim.raw_byte_power += raw_delta;
        claim.quality_adj_power += qa_delta;
        self.set_claim(store, miner, claim)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateMinerParams {
    pub owner: Address,
    pub worker: Address,
    pub seal_proof_type: RegisteredSealProof,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateMinerReturn {
    /// The canonical ID-based address for the actor
    pub id_address: Address,
    /// A more expensive but re-org-safe address for the newly created actor
    pub robust_address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateClaimedPowerParams {
    pub raw_byte_delta: StoragePower,
    pub quality_adjusted_delta: StoragePower,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePledgeTotalParams {
    pub pledge_delta: TokenAmount,
}

pub(crate) fn invoke<RT: Runtime>(
    rt: &mut RT,
    method: MethodNum,
    params: MethodParams,
) -> Result<ReturnValue, ActorError> {
    match method {
        CREATE_MINER => create_miner(rt, crate::expect_params!(params, CreateMiner)),
        UPDATE_CLAIMED_POWER => update_claimed_power(rt, crate::expect_params!(params, UpdateClaimedPower)),
        UPDATE_PLEDGE_TOTAL => update_pledge_total(rt, crate::expect_params!(params, UpdatePledgeTotal)),
        ON_EPOCH_TICK_END => on_epoch_tick_end(rt),
        _ => Err(unhandled(ActorCode::StoragePower, method)),
    }
}

fn create_miner<RT: Runtime>(rt: &mut RT, params: CreateMinerParams) -> Result<ReturnValue, ActorError> {
    rt.validate_caller_type(&[ActorCode::Account, ActorCode::Multisig])?;

    let ctor = MethodParams::MinerConstructor(miner::MinerConstructorParams {
        owner: params.owner,
        worker: params.worker,
        seal_proof_type: params.seal_proof_type,
    });
    let exec = MethodParams::Exec(init::ExecParams {
        code: ActorCode::StorageMiner,
        constructor_params: Box::new(ctor),
    });

    let value = rt.value_received();
    let ret = rt.send(&INIT_ACTOR_ADDR, init::EXEC, exec, value)?;
    let ret = match ret {
        ReturnValue::Exec(ret) => ret,
        other => {
            return Err(ActorError::illegal_state(format!("unexpected init return {:?}", other)));
        }
    };

    rt.transaction(|st: &mut State, rt| {
        let claim = Claim {
            seal_proof_type: params.seal_proof_type,
            raw_byte_power: StoragePower::zero(),
            quality_adj_power: StoragePower::zero(),
        };
        st.set_claim(rt.store(), &ret.id_address, claim)?;
        st.miner_count += 1;
        Ok(())
    })?;

    rt.log(format!("created miner {} ({})", ret.id_address, ret.robust_address));

    Ok(ReturnValue::CreateMiner(CreateMinerReturn {
        id_address: ret.id_address,
        robust_address: ret.robust_address,
    }))
}

fn update_claimed_power<RT: Runtime>(rt: &mut RT, params: UpdateClaimedPowerParams) -> Result<ReturnValue, ActorError> {
    rt.validate_caller_type(&[ActorCode::StorageMiner])?;
    let miner = rt.caller();

    rt.transaction(|st: &mut State, rt| {
        st.add_to_claim(rt.store(), &miner, params.raw_byte_delta, params.quality_adjusted_delta)
    })?;
    Ok(ReturnValue::None)
}

fn update_pledge_total<RT: Runtime>(rt: &mut RT, params: UpdatePledgeTotalParams) -> Result<ReturnValue, ActorError> {
    rt.validate_caller_type(&[ActorCode::StorageMiner])?;

    rt.transaction(|st: &mut State, _| {
        st.total_pledge_collateral += params.pledge_delta;
        if st.total_pledge_collateral.is_negative() {
            return Err(ActorError::illegal_state(format!(
                "negative total pledge collateral {}",
                st.total_pledge_collateral
            )));
        }
        Ok(())
    })?;
    Ok(ReturnValue::None)
}

/// Reports network power to the reward actor at the end of each epoch.
fn on_epoch_tick_end<RT: Runtime>(rt: &mut RT) -> Result<ReturnValue, ActorError> {
    rt.validate_caller_is(&[CRON_ACTOR_ADDR])?;

    let st: State = rt.state()?;
    let (raw, _) = st.current_total_power();
    rt.send(
        &REWARD_ACTOR_ADDR,
        reward::UPDATE_NETWORK_KPI,
        MethodParams::UpdateNetworkKpi(Some(raw)),
        TokenAmount::zero(),
    )
    .map_err(|e| e.wrap("failed to update network KPI"))?;
    Ok(ReturnValue::None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MapStore(RefCell<HashMap<Cid, Vec<u8>>>);

    impl Blockstore for MapStore {
        fn get(&self, cid: &Cid) -> Option<Vec<u8>> {
            self.0.borrow().get(cid).cloned()
        }

        fn put(&self, block: Vec<u8>) -> Cid {
            let cid = Cid::of(&block);
            self.0.borrow_mut().insert(cid, block);
            cid
        }
    }

    fn claim(proof: RegisteredSealProof, raw: i128) -> Claim {
        Claim {
            seal_proof_type: proof,
            raw_byte_power: StoragePower::new(raw),
            quality_adj_power: StoragePower::new(raw),
        }
    }

    #[test]
    fn test_small_miners_eligible_below_min_miner_count() {
        let store = MapStore::default();
        let mut st = State::new(&store).unwrap();
        let proof = RegisteredSealProof::StackedDrg32GiBV1_1;
        let a = Address::new_id(100);
        let b = Address::new_id(101);

        st.set_claim(&store, &a, claim(proof, 0)).unwrap();
        st.set_claim(&store, &b, claim(proof, 1 << 35)).unwrap();

        assert_eq!(st.miner_above_min_power_count, 0);
        assert!(!st.miner_nominal_power_meets_consensus_minimum(&store, &a).unwrap());
        assert!(st.miner_nominal_power_meets_consensus_minimum(&store, &b).unwrap());

        // Nobody is above the minimum, so consensus uses committed totals
        assert_eq!(st.current_total_power().1, StoragePower::new(1 << 35));
        assert!(st.total_quality_adj_power.is_zero());
    }

    #[test]
    fn test_totals_follow_claim_updates() {
        let store = MapStore::default();
        let mut st = State::new(&store).unwrap();
        let proof = RegisteredSealProof::StackedDrg2KiBV1_1;
        let a = Address::new_id(100);

        st.set_claim(&store, &a, claim(proof, 0)).unwrap();
        // 2KiB has no minimum, so even an empty claim counts
        assert_eq!(st.miner_above_min_power_count, 1);

        st.add_to_claim(&store, &a, StoragePower::new(2048), StoragePower::new(2048))
            .unwrap();
        st.add_to_claim(&store, &a, StoragePower::new(2048), StoragePower::new(2048))
            .unwrap();
        assert_eq!(st.total_quality_adj_power, StoragePower::new(4096));
        assert_eq!(st.total_qa_bytes_committed, StoragePower::new(4096));
        assert_eq!(st.miner_above_min_power_count, 1);
        assert_eq!(st.get_claim(&store, &a).unwrap().unwrap().raw_byte_power, StoragePower::new(4096));
    }

    #[test]
    fn test_missing_claim() {
        let store = MapStore::default();
        let st = State::new(&store).unwrap();
        let err = st
            .miner_nominal_power_meets_consensus_minimum(&store, &Address::new_id(555))
            .unwrap_err();
        assert_eq!(err.exit_code(), crate::ExitCode::ERR_NOT_FOUND);
    }

    #[test]
    fn test_missing_claim_root_is_illegal_state() {
        let store = MapStore::default();
        let mut st = State::new(&store).unwrap();
        st.claims = Cid::of(b"nowhere");
        let err = st.get_claim(&store, &Address::new_id(100)).unwrap_err();
        assert_eq!(err.exit_code(), crate::ExitCode::ERR_ILLEGAL_STATE);
    }
}
