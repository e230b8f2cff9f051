//! In-memory ledger executing the builtin actors.

use crate::error::LedgerError;
use crate::keys::DeterministicKeyProvider;
use crate::ledger::Ledger;
use crate::state::{ActorSnapshot, LedgerState, LedgerStateExt};
use crate::stats::{CallStatistics, MethodKey};
use crate::store::MemoryBlockstore;
use powersim_actors::builtin::{
    self, account, cron, init, power, reward, system, BURNT_FUNDS_ACTOR_ADDR, CRON_ACTOR_ADDR, INIT_ACTOR_ADDR,
    METHOD_CONSTRUCTOR, METHOD_SEND, REWARD_ACTOR_ADDR, STORAGE_POWER_ACTOR_ADDR, SYSTEM_ACTOR_ADDR,
};
use powersim_actors::{
    ActorCode, ActorError, Address, Blockstore, BlockstoreExt, ChainEpoch, Cid, ExitCode, MethodNum, MethodParams,
    ReturnValue, Runtime, TokenAmount,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::{debug, trace};

/// Network name recorded in the init actor.
pub const NETWORK_NAME: &str = "powersim";

/// Tokens held by the burnt-funds actor at genesis, used to fund accounts.
pub const FAUCET_SUPPLY: TokenAmount = TokenAmount::new(1_000_000_000_000_000_000);

/// Maximum nesting of sends within one message.
pub const MAX_CALL_DEPTH: usize = 64;

/// The top-level message currently executing.
#[derive(Debug, Clone, Copy)]
struct Origin {
    address: Address,
    call_seq: u64,
    actors_created: u64,
}

/// In-memory ledger.
///
/// The state tree maps ID addresses to actors; actor state objects live in
/// a block store shared by all handles derived through [`Ledger::with_epoch`].
pub struct Vm {
    epoch: ChainEpoch,
    store: Rc<MemoryBlockstore>,
    actors: BTreeMap<Address, ActorSnapshot>,
    logs: Vec<String>,
    stats: CallStatistics,
    origin: Origin,
    accounts_created: u64,
}

impl Vm {
    /// Creates a ledger at epoch 0 holding the singleton actors.
    pub fn new() -> Result<Self, LedgerError> {
        let mut vm = Self {
            epoch: 0,
            store: Rc::new(MemoryBlockstore::new()),
            actors: BTreeMap::new(),
            logs: Vec::new(),
            stats: CallStatistics::new(),
            origin: Origin {
                address: SYSTEM_ACTOR_ADDR,
                call_seq: 0,
                actors_created: 0,
            },
            accounts_created: 0,
        };

        let power_state = power::State::new(vm.store.as_ref()).map_err(|e| LedgerError::decode(STORAGE_POWER_ACTOR_ADDR, e))?;

        vm.install(SYSTEM_ACTOR_ADDR, ActorCode::System, &system::State {}, TokenAmount::zero())?;
        vm.install(INIT_ACTOR_ADDR, ActorCode::Init, &init::State::new(NETWORK_NAME), TokenAmount::zero())?;
        vm.install(
            REWARD_ACTOR_ADDR,
            ActorCode::Reward,
            &reward::State::new(reward::GENESIS_REWARD_SUPPLY),
            reward::GENESIS_REWARD_SUPPLY,
        )?;
        vm.install(CRON_ACTOR_ADDR, ActorCode::Cron, &cron::State::genesis(), TokenAmount::zero())?;
        vm.install(STORAGE_POWER_ACTOR_ADDR, ActorCode::StoragePower, &power_state, TokenAmount::zero())?;
        vm.install(
            BURNT_FUNDS_ACTOR_ADDR,
            ActorCode::Account,
            &account::State {
                address: BURNT_FUNDS_ACTOR_ADDR,
            },
            FAUCET_SUPPLY,
        )?;

        Ok(vm)
    }

    fn install<S: Serialize>(
        &mut self,
        address: Address,
        code: ActorCode,
        state: &S,
        balance: TokenAmount,
    ) -> Result<(), LedgerError> {
        let head = self.store.put_obj(state)?;
        self.actors.insert(
            address,
            ActorSnapshot {
                code,
                head,
                balance,
                call_seq: 0,
            },
        );
        Ok(())
    }

    /// All actors in ID order.
    pub fn actors(&self) -> impl Iterator<Item = (&Address, &ActorSnapshot)> {
        self.actors.iter()
    }

    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    /// Sum of all actor balances. Constant across message application.
    pub fn total_balance(&self) -> TokenAmount {
        self.actors.values().map(|a| a.balance).sum()
    }

    // =========================================================================
    // EXECUTION
    // =========================================================================

    /// Sends a message and rolls back the state tree if it fails.
    fn send(
        &mut self,
        from: Address,
        to: &Address,
        value: TokenAmount,
        method: MethodNum,
        params: MethodParams,
        depth: usize,
    ) -> Result<ReturnValue, ActorError> {
        if depth > MAX_CALL_DEPTH {
            return Err(ActorError::new(
                ExitCode::SYS_ERR_FORBIDDEN,
                format!("call depth {} exceeds {}", depth, MAX_CALL_DEPTH),
            ));
        }

        let snapshot = self.actors.clone();
        let result = self.send_inner(from, to, value, method, params, depth);
        if result.is_err() {
            self.actors = snapshot;
        }
        result
    }

    fn send_inner(
        &mut self,
        from: Address,
        to: &Address,
        value: TokenAmount,
        method: MethodNum,
        params: MethodParams,
        depth: usize,
    ) -> Result<ReturnValue, ActorError> {
        let receiver = match self.resolve(to) {
            Some(id) => id,
            None if to.is_key() => self.create_account(to, depth)?,
            None => {
                return Err(ActorError::new(
                    ExitCode::SYS_ERR_INVALID_RECEIVER,
                    format!("actor {} not found", to),
                ))
            }
        };

        self.transfer(&from, &receiver, value)?;

        let code = self
            .actors
            .get(&receiver)
            .map(|a| a.code)
            .ok_or_else(|| ActorError::new(ExitCode::SYS_ERR_INVALID_RECEIVER, format!("actor {} not found", receiver)))?;
        let key = MethodKey::new(code, method);
        self.stats.record_call(key);

        trace!(
            from = %from,
            to = %receiver,
            method = %key.name(),
            value = %value,
            depth,
            "invoke"
        );

        if method == METHOD_SEND {
            return Ok(ReturnValue::None);
        }

        let mut ctx = InvocationContext {
            vm: self,
            caller: from,
            receiver,
            value,
            key,
            depth,
        };
        builtin::invoke(&mut ctx, code, method, params)
    }

    fn transfer(&mut self, from: &Address, to: &Address, value: TokenAmount) -> Result<(), ActorError> {
        if value.is_negative() {
            return Err(ActorError::new(
                ExitCode::SYS_ERR_ILLEGAL_ARGUMENT,
                format!("negative value {}", value),
            ));
        }
        if value.is_zero() || from == to {
            return Ok(());
        }

        let sender = self
            .actors
            .get_mut(from)
            .ok_or_else(|| ActorError::new(ExitCode::SYS_ERR_SENDER_INVALID, format!("sender {} not found", from)))?;
        if sender.balance < value {
            return Err(ActorError::new(
                ExitCode::SYS_ERR_INSUFFICIENT_FUNDS,
                format!("{} has {} but tried to send {}", from, sender.balance, value),
            ));
        }
        sender.balance -= value;

        let recipient = self
            .actors
            .get_mut(to)
            .ok_or_else(|| ActorError::new(ExitCode::SYS_ERR_INVALID_RECEIVER, format!("actor {} not found", to)))?;
        recipient.balance += value;
        Ok(())
    }

    /// Creates an account actor for a key address that received a message.
    fn create_account(&mut self, key: &Address, depth: usize) -> Result<Address, ActorError> {
        let mut st: init::State = self
            .get_state(&INIT_ACTOR_ADDR)
            .map_err(|e| ActorError::illegal_state(e.to_string()))?;
        let id = st.map_address_to_new_id(key);
        let head = self.store.put_obj(&st)?;
        if let Some(init_actor) = self.actors.get_mut(&INIT_ACTOR_ADDR) {
            init_actor.head = head;
        }

        let empty = self.store.put_obj(&())?;
        self.actors.insert(
            id,
            ActorSnapshot {
                code: ActorCode::Account,
                head: empty,
                balance: TokenAmount::zero(),
                call_seq: 0,
            },
        );

        self.send(
            SYSTEM_ACTOR_ADDR,
            &id,
            TokenAmount::zero(),
            METHOD_CONSTRUCTOR,
            MethodParams::AccountConstructor(*key),
            depth + 1,
        )?;
        Ok(id)
    }

    fn resolve(&self, address: &Address) -> Option<Address> {
        let id = if address.is_id() {
            *address
        } else {
            let st: init::State = self.get_state(&INIT_ACTOR_ADDR).ok()?;
            st.resolve_address(address)?
        };
        self.actors.contains_key(&id).then_some(id)
    }
}

impl LedgerState for Vm {
    fn epoch(&self) -> ChainEpoch {
        self.epoch
    }

    fn actor(&self, address: &Address) -> Option<ActorSnapshot> {
        let id = self.resolve(address)?;
        self.actors.get(&id).cloned()
    }

    fn resolve_address(&self, address: &Address) -> Option<Address> {
        self.resolve(address)
    }

    fn store(&self) -> &dyn Blockstore {
        self.store.as_ref()
    }
}

impl Ledger for Vm {
    fn apply_message(
        &mut self,
        from: &Address,
        to: &Address,
        value: TokenAmount,
        method: MethodNum,
        params: MethodParams,
    ) -> (ReturnValue, ExitCode) {
        let snapshot = self.actors.clone();

        let sender = match self.resolve(from) {
            Some(id) => id,
            None => {
                self.logs.push(format!("message from unknown sender {}", from));
                return (ReturnValue::None, ExitCode::SYS_ERR_SENDER_INVALID);
            }
        };

        let call_seq = match self.actors.get_mut(&sender) {
            Some(actor) => {
                actor.call_seq += 1;
                actor.call_seq - 1
            }
            None => return (ReturnValue::None, ExitCode::SYS_ERR_SENDER_INVALID),
        };
        self.origin = Origin {
            address: sender,
            call_seq,
            actors_created: 0,
        };

        match self.send(sender, to, value, method, params, 0) {
            Ok(ret) => (ret, ExitCode::OK),
            Err(e) => {
                self.actors = snapshot;
                debug!(from = %from, to = %to, method, error = %e, "message failed");
                self.logs.push(format!("message {} -> {} method {} failed: {}", from, to, method, e));
                (ReturnValue::None, e.exit_code())
            }
        }
    }

    fn logs(&self) -> Vec<String> {
        self.logs.clone()
    }

    fn call_stats(&self) -> CallStatistics {
        self.stats.clone()
    }

    fn with_epoch(&self, epoch: ChainEpoch) -> Result<Self, LedgerError> {
        if epoch < self.epoch {
            return Err(LedgerError::Epoch {
                from: self.epoch,
                to: epoch,
            });
        }
        Ok(Self {
            epoch,
            store: Rc::clone(&self.store),
            actors: self.actors.clone(),
            logs: Vec::new(),
            stats: CallStatistics::new(),
            origin: self.origin,
            accounts_created: self.accounts_created,
        })
    }

    fn create_accounts(&mut self, count: usize, balance: TokenAmount, seed: u64) -> Result<Vec<Address>, LedgerError> {
        let mut keys = DeterministicKeyProvider::new(seed);
        let mut ids = Vec::with_capacity(count);

        for _ in 0..count {
            let key_address = keys.account_address(self.accounts_created);
            self.accounts_created += 1;

            let (_, code) = self.apply_message(
                &BURNT_FUNDS_ACTOR_ADDR,
                &key_address,
                balance,
                METHOD_SEND,
                MethodParams::None,
            );
            if !code.is_success() {
                return Err(LedgerError::AccountCreation(format!(
                    "funding {} with {} failed: {}",
                    key_address, balance, code
                )));
            }

            let id = self.resolve(&key_address).ok_or_else(|| {
                LedgerError::AccountCreation(format!("account {} missing after funding", key_address))
            })?;
            ids.push(id);
        }

        debug!(count, balance = %balance, "created accounts");
        Ok(ids)
    }
}

// =============================================================================
// RUNTIME
// =============================================================================

/// Runtime handed to actor code for one invocation.
struct InvocationContext<'a> {
    vm: &'a mut Vm,
    caller: Address,
    receiver: Address,
    value: TokenAmount,
    key: MethodKey,
    depth: usize,
}

impl InvocationContext<'_> {
    fn head(&self) -> Result<Cid, ActorError> {
        self.vm
            .actors
            .get(&self.receiver)
            .map(|a| a.head)
            .ok_or_else(|| ActorError::illegal_state(format!("receiver {} vanished", self.receiver)))
    }
}

impl Runtime for InvocationContext<'_> {
    fn epoch(&self) -> ChainEpoch {
        self.vm.epoch
    }

    fn caller(&self) -> Address {
        self.caller
    }

    fn caller_code(&self) -> Option<ActorCode> {
        self.vm.actors.get(&self.caller).map(|a| a.code)
    }

    fn receiver(&self) -> Address {
        self.receiver
    }

    fn value_received(&self) -> TokenAmount {
        self.value
    }

    fn current_balance(&self) -> TokenAmount {
        self.vm
            .actors
            .get(&self.receiver)
            .map(|a| a.balance)
            .unwrap_or_default()
    }

    fn store(&self) -> &dyn Blockstore {
        self.vm.store.as_ref()
    }

    fn state<S: DeserializeOwned>(&mut self) -> Result<S, ActorError> {
        let head = self.head()?;
        let bytes = self
            .vm
            .store
            .get(&head)
            .ok_or_else(|| ActorError::illegal_state(format!("state {} of {} missing", head, self.receiver)))?;
        self.vm.stats.record_read(self.key, bytes.len());
        serde_json::from_slice(&bytes)
            .map_err(|e| ActorError::serialization(format!("failed to decode state of {}: {}", self.receiver, e)))
    }

    fn set_state<S: Serialize>(&mut self, state: &S) -> Result<(), ActorError> {
        let bytes = serde_json::to_vec(state)
            .map_err(|e| ActorError::serialization(format!("failed to encode state of {}: {}", self.receiver, e)))?;
        self.vm.stats.record_write(self.key, bytes.len());
        let head = self.vm.store.put(bytes);
        let actor = self
            .vm
            .actors
            .get_mut(&self.receiver)
            .ok_or_else(|| ActorError::illegal_state(format!("receiver {} vanished", self.receiver)))?;
        actor.head = head;
        Ok(())
    }

    fn send(
        &mut self,
        to: &Address,
        method: MethodNum,
        params: MethodParams,
        value: TokenAmount,
    ) -> Result<ReturnValue, ActorError> {
        self.vm.send(self.receiver, to, value, method, params, self.depth + 1)
    }

    fn resolve_address(&self, address: &Address) -> Option<Address> {
        self.vm.resolve(address)
    }

    fn actor_code(&self, address: &Address) -> Option<ActorCode> {
        let id = self.vm.resolve(address)?;
        self.vm.actors.get(&id).map(|a| a.code)
    }

    fn new_actor_address(&mut self) -> Address {
        // Unique per (origin, call sequence, creation index within the message)
        let origin = &mut self.vm.origin;
        let seq = (origin.call_seq << 16) | (origin.actors_created & 0xffff);
        origin.actors_created += 1;
        Address::new_actor(&origin.address, seq)
    }

    fn create_actor(&mut self, code: ActorCode, address: &Address) -> Result<(), ActorError> {
        if self.receiver != INIT_ACTOR_ADDR {
            return Err(ActorError::forbidden(format!("{} may not create actors", self.receiver)));
        }
        if code.is_singleton() {
            return Err(ActorError::illegal_argument(format!("cannot create singleton {}", code)));
        }
        if !address.is_id() || self.vm.actors.contains_key(address) {
            return Err(ActorError::illegal_argument(format!("cannot create actor at {}", address)));
        }

        let empty = self.vm.store.put_obj(&())?;
        self.vm.actors.insert(
            *address,
            ActorSnapshot {
                code,
                head: empty,
                balance: TokenAmount::zero(),
                call_seq: 0,
            },
        );
        Ok(())
    }

    fn log(&mut self, message: String) {
        trace!(actor = %self.receiver, "{}", message);
        self.vm.logs.push(format!("[{}] {}", self.receiver, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use powersim_actors::builtin::{miner, multisig};
    use powersim_actors::RegisteredSealProof;

    fn vm_with_accounts(n: usize, balance: i128) -> (Vm, Vec<Address>) {
        let mut vm = Vm::new().unwrap();
        let accounts = vm.create_accounts(n, TokenAmount::new(balance), 7).unwrap();
        (vm, accounts)
    }

    fn create_miner(vm: &mut Vm, owner: Address, value: i128, proof: RegisteredSealProof) -> power::CreateMinerReturn {
        let params = MethodParams::CreateMiner(power::CreateMinerParams {
            owner,
            worker: owner,
            seal_proof_type: proof,
        });
        let (ret, code) = vm.apply_message(
            &owner,
            &STORAGE_POWER_ACTOR_ADDR,
            TokenAmount::new(value),
            power::CREATE_MINER,
            params,
        );
        assert_eq!(code, ExitCode::OK, "{:?}", vm.logs());
        match ret {
            ReturnValue::CreateMiner(ret) => ret,
            other => panic!("unexpected return {:?}", other),
        }
    }

    #[test]
    fn test_genesis_singletons() {
        let vm = Vm::new().unwrap();
        assert_eq!(vm.actor_count(), 6);
        assert_eq!(vm.epoch(), 0);
        assert_eq!(vm.actor(&CRON_ACTOR_ADDR).unwrap().code, ActorCode::Cron);
        assert_eq!(vm.balance(&REWARD_ACTOR_ADDR), reward::GENESIS_REWARD_SUPPLY);

        let st: init::State = vm.get_state(&INIT_ACTOR_ADDR).unwrap();
        assert_eq!(st.network_name, NETWORK_NAME);
    }

    #[test]
    fn test_create_accounts_funds_from_faucet() {
        let (vm, accounts) = vm_with_accounts(3, 1000);
        assert_eq!(accounts, vec![Address::new_id(100), Address::new_id(101), Address::new_id(102)]);
        for a in &accounts {
            assert_eq!(vm.balance(a), TokenAmount::new(1000));
            assert_eq!(vm.actor(a).unwrap().code, ActorCode::Account);
        }
        assert_eq!(vm.balance(&BURNT_FUNDS_ACTOR_ADDR), FAUCET_SUPPLY - TokenAmount::new(3000));
    }

    #[test]
    fn test_create_accounts_is_deterministic() {
        let (vm1, _) = vm_with_accounts(2, 10);
        let (vm2, _) = vm_with_accounts(2, 10);
        let st1: init::State = vm1.get_state(&INIT_ACTOR_ADDR).unwrap();
        let st2: init::State = vm2.get_state(&INIT_ACTOR_ADDR).unwrap();
        assert_eq!(st1.address_map, st2.address_map);
    }

    #[test]
    fn test_failed_message_rolls_back() {
        let (mut vm, accounts) = vm_with_accounts(2, 100);
        let before = vm.actor(&accounts[0]).unwrap();

        let (_, code) = vm.apply_message(
            &accounts[0],
            &accounts[1],
            TokenAmount::new(101),
            METHOD_SEND,
            MethodParams::None,
        );
        assert_eq!(code, ExitCode::SYS_ERR_INSUFFICIENT_FUNDS);
        assert_eq!(vm.actor(&accounts[0]).unwrap(), before);
        assert_eq!(vm.balance(&accounts[1]), TokenAmount::new(100));
        assert!(!vm.logs().is_empty());
    }

    #[test]
    fn test_unknown_receiver() {
        let (mut vm, accounts) = vm_with_accounts(1, 100);
        let (_, code) = vm.apply_message(
            &accounts[0],
            &Address::new_id(5000),
            TokenAmount::new(1),
            METHOD_SEND,
            MethodParams::None,
        );
        assert_eq!(code, ExitCode::SYS_ERR_INVALID_RECEIVER);

        let (_, code) = vm.apply_message(
            &Address::new_id(5000),
            &accounts[0],
            TokenAmount::new(1),
            METHOD_SEND,
            MethodParams::None,
        );
        assert_eq!(code, ExitCode::SYS_ERR_SENDER_INVALID);
    }

    #[test]
    fn test_create_miner_registers_claim() {
        let (mut vm, accounts) = vm_with_accounts(1, 1000);
        let ret = create_miner(&mut vm, accounts[0], 1000, RegisteredSealProof::StackedDrg32GiBV1_1);

        assert_eq!(ret.id_address, Address::new_id(101));
        assert_eq!(vm.resolve_address(&ret.robust_address), Some(ret.id_address));
        assert_eq!(vm.balance(&ret.id_address), TokenAmount::new(1000));
        assert!(vm.balance(&accounts[0]).is_zero());

        let st: power::State = vm.get_state(&STORAGE_POWER_ACTOR_ADDR).unwrap();
        assert_eq!(st.miner_count, 1);
        let claim = st.get_claim(vm.store(), &ret.id_address).unwrap().unwrap();
        assert!(claim.raw_byte_power.is_zero());

        let stats = vm.call_stats();
        let create = stats
            .get(&MethodKey::new(ActorCode::StoragePower, power::CREATE_MINER))
            .unwrap();
        assert_eq!(create.calls, 1);
        assert!(create.writes >= 1);
    }

    #[test]
    fn test_only_power_actor_creates_miners() {
        let (mut vm, accounts) = vm_with_accounts(1, 1000);
        let exec = MethodParams::Exec(init::ExecParams {
            code: ActorCode::StorageMiner,
            constructor_params: Box::new(MethodParams::MinerConstructor(miner::MinerConstructorParams {
                owner: accounts[0],
                worker: accounts[0],
                seal_proof_type: RegisteredSealProof::StackedDrg2KiBV1_1,
            })),
        });
        let (_, code) = vm.apply_message(&accounts[0], &INIT_ACTOR_ADDR, TokenAmount::zero(), init::EXEC, exec);
        assert_eq!(code, ExitCode::ERR_FORBIDDEN);
    }

    #[test]
    fn test_sector_lifecycle_claims_power() {
        let (mut vm, accounts) = vm_with_accounts(1, 1000);
        let owner = accounts[0];
        let ret = create_miner(&mut vm, owner, 1000, RegisteredSealProof::StackedDrg2KiBV1_1);
        let miner_addr = ret.id_address;

        let mut vm = vm.with_epoch(10).unwrap();
        let precommit = MethodParams::PreCommitSector(miner::SectorPreCommitInfo {
            seal_proof: RegisteredSealProof::StackedDrg2KiBV1_1,
            sector_number: 0,
            sealed_cid: Cid::of(b"sector-0"),
            seal_rand_epoch: 9,
            expiration: 10 + miner::MAX_PROVE_COMMIT_DURATION + miner::MIN_SECTOR_EXPIRATION,
        });
        let (_, code) = vm.apply_message(&owner, &miner_addr, TokenAmount::zero(), miner::PRE_COMMIT_SECTOR, precommit);
        assert_eq!(code, ExitCode::OK, "{:?}", vm.logs());

        // Too early to prove
        let prove = MethodParams::ProveCommitSector(miner::ProveCommitSectorParams {
            sector_number: 0,
            proof: vec![1],
        });
        let (_, code) = vm.apply_message(
            &owner,
            &miner_addr,
            TokenAmount::zero(),
            miner::PROVE_COMMIT_SECTOR,
            prove.clone(),
        );
        assert_eq!(code, ExitCode::ERR_FORBIDDEN);

        let mut vm = vm.with_epoch(10 + miner::PRE_COMMIT_CHALLENGE_DELAY).unwrap();
        let (_, code) = vm.apply_message(&owner, &miner_addr, TokenAmount::zero(), miner::PROVE_COMMIT_SECTOR, prove);
        assert_eq!(code, ExitCode::OK, "{:?}", vm.logs());

        let st: power::State = vm.get_state(&STORAGE_POWER_ACTOR_ADDR).unwrap();
        let claim = st.get_claim(vm.store(), &miner_addr).unwrap().unwrap();
        assert_eq!(claim.quality_adj_power, RegisteredSealProof::StackedDrg2KiBV1_1.sector_size());
        assert_eq!(st.total_quality_adj_power, claim.quality_adj_power);
        assert_eq!(st.total_pledge_collateral, TokenAmount::new(1));

        let mst: miner::State = vm.get_state(&miner_addr).unwrap();
        assert_eq!(mst.sectors.len(), 1);
        assert!(mst.pre_committed_sectors.is_empty());
        assert_eq!(mst.initial_pledge, TokenAmount::new(1));
    }

    #[test]
    fn test_award_block_reward_and_cron() {
        let (mut vm, accounts) = vm_with_accounts(1, 1000);
        let ret = create_miner(&mut vm, accounts[0], 1000, RegisteredSealProof::StackedDrg2KiBV1_1);
        let total_before = vm.total_balance();

        let award = MethodParams::AwardBlockReward(reward::AwardBlockRewardParams {
            miner: ret.id_address,
            penalty: TokenAmount::zero(),
            gas_reward: TokenAmount::zero(),
            win_count: 2,
        });
        let (_, code) = vm.apply_message(
            &SYSTEM_ACTOR_ADDR,
            &REWARD_ACTOR_ADDR,
            TokenAmount::zero(),
            reward::AWARD_BLOCK_REWARD,
            award,
        );
        assert_eq!(code, ExitCode::OK, "{:?}", vm.logs());

        // 1_000_000 per epoch, two of five expected wins
        assert_eq!(vm.balance(&ret.id_address), TokenAmount::new(1000 + 400_000));
        let mst: miner::State = vm.get_state(&ret.id_address).unwrap();
        assert_eq!(mst.total_rewards, TokenAmount::new(400_000));

        let (_, code) = vm.apply_message(
            &SYSTEM_ACTOR_ADDR,
            &CRON_ACTOR_ADDR,
            TokenAmount::zero(),
            cron::EPOCH_TICK,
            MethodParams::None,
        );
        assert_eq!(code, ExitCode::OK, "{:?}", vm.logs());
        let rst: reward::State = vm.get_state(&REWARD_ACTOR_ADDR).unwrap();
        assert_eq!(rst.effective_network_time, 1);

        assert_eq!(vm.total_balance(), total_before);
    }

    #[test]
    fn test_multisig_propose_and_approve() {
        let (mut vm, accounts) = vm_with_accounts(3, 1000);
        let ctor = MethodParams::MultisigConstructor(multisig::ConstructorParams {
            signers: vec![accounts[0], accounts[1]],
            num_approvals_threshold: 2,
            unlock_duration: 0,
            start_epoch: 0,
        });
        let exec = MethodParams::Exec(init::ExecParams {
            code: ActorCode::Multisig,
            constructor_params: Box::new(ctor),
        });
        let (ret, code) = vm.apply_message(&accounts[0], &INIT_ACTOR_ADDR, TokenAmount::new(500), init::EXEC, exec);
        assert_eq!(code, ExitCode::OK, "{:?}", vm.logs());
        let wallet = match ret {
            ReturnValue::Exec(ret) => ret.id_address,
            other => panic!("unexpected return {:?}", other),
        };

        let propose = MethodParams::Propose(multisig::ProposeParams {
            to: accounts[2],
            value: TokenAmount::new(200),
            method: METHOD_SEND,
            params: Box::new(MethodParams::None),
        });
        let (ret, code) = vm.apply_message(&accounts[0], &wallet, TokenAmount::zero(), multisig::PROPOSE, propose);
        assert_eq!(code, ExitCode::OK);
        let txn_id = match ret {
            ReturnValue::Propose(ret) => {
                assert!(!ret.applied);
                ret.txn_id
            }
            other => panic!("unexpected return {:?}", other),
        };

        // Non-signer cannot approve
        let approve = MethodParams::Approve(multisig::TxnIdParams { id: txn_id });
        let (_, code) = vm.apply_message(&accounts[2], &wallet, TokenAmount::zero(), multisig::APPROVE, approve.clone());
        assert_eq!(code, ExitCode::ERR_FORBIDDEN);

        let (ret, code) = vm.apply_message(&accounts[1], &wallet, TokenAmount::zero(), multisig::APPROVE, approve);
        assert_eq!(code, ExitCode::OK);
        assert!(matches!(ret, ReturnValue::Approve(ref r) if r.applied && r.code == ExitCode::OK));
        assert_eq!(vm.balance(&accounts[2]), TokenAmount::new(1200));
        assert_eq!(vm.balance(&wallet), TokenAmount::new(300));
    }

    #[test]
    fn test_with_epoch_keeps_old_handle() {
        let (vm, accounts) = vm_with_accounts(2, 100);
        let mut next = vm.with_epoch(1).unwrap();
        let (_, code) = next.apply_message(
            &accounts[0],
            &accounts[1],
            TokenAmount::new(40),
            METHOD_SEND,
            MethodParams::None,
        );
        assert_eq!(code, ExitCode::OK);

        assert_eq!(next.epoch(), 1);
        assert_eq!(next.balance(&accounts[1]), TokenAmount::new(140));
        assert_eq!(vm.balance(&accounts[1]), TokenAmount::new(100));
        assert_eq!(next.call_stats().total_calls(), 1);

        assert!(matches!(next.with_epoch(0), Err(LedgerError::Epoch { from: 1, to: 0 })));
    }

    #[test]
    fn test_send_to_new_key_address_creates_account() {
        let (mut vm, accounts) = vm_with_accounts(1, 100);
        let fresh = Address::new_key(b"fresh");
        let (_, code) = vm.apply_message(&accounts[0], &fresh, TokenAmount::new(5), METHOD_SEND, MethodParams::None);
        assert_eq!(code, ExitCode::OK);

        let id = vm.resolve_address(&fresh).unwrap();
        assert_eq!(vm.balance(&id), TokenAmount::new(5));
        let st: account::State = vm.get_state(&fresh).unwrap();
        assert_eq!(st.address, fresh);
    }
}
