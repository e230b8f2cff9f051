//! Sim - the epoch-by-epoch simulation engine.

use crate::account::{AccountAgent, AccountAgentConfig};
use crate::agent::Agent;
use crate::error::{AgentError, SimError, TickPhase};
use crate::message::{Message, MessageSummary};
use crate::miner::{MinerAgent, MinerAgentConfig};
use crate::power_table::{compute_power_table, PowerTable};
use crate::win_count::win_count;
use powersim_actors::builtin::{
    cron, power, reward, CRON_ACTOR_ADDR, REWARD_ACTOR_ADDR, STORAGE_POWER_ACTOR_ADDR, SYSTEM_ACTOR_ADDR,
};
use powersim_actors::{Address, ChainEpoch, MethodParams, ReturnValue, TokenAmount};
use powersim_vm::{CallStatistics, Ledger, LedgerState, Vm};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Configuration for a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Number of funded accounts created at genesis
    pub account_count: usize,

    /// Balance of each account
    pub account_initial_balance: TokenAmount,

    /// Master seed for determinism
    pub seed: u64,

    /// Chance per epoch of promoting the next account to a miner
    pub create_miner_probability: f32,

    /// Tuning passed to every miner the engine creates. The starting
    /// balance is overridden with the account balance.
    pub miner: MinerAgentConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            account_count: 20,
            account_initial_balance: TokenAmount::new(1_000),
            seed: 42,
            create_miner_probability: 0.1,
            miner: MinerAgentConfig::default(),
        }
    }
}

/// A block reward paid during a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockReward {
    pub miner: Address,
    pub wins: u64,
}

/// What happened during one tick.
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    /// Epoch the tick executed at
    pub epoch: ChainEpoch,
    /// Power table observed before the tick's messages
    pub power_table: PowerTable,
    /// Batch messages in applied order
    pub messages: Vec<MessageSummary>,
    /// Agents added by return handlers
    pub agents_joined: usize,
    /// Rewards paid, in power table order
    pub rewards: Vec<BlockReward>,
}

impl TickReport {
    pub fn blocks_won(&self) -> u64 {
        self.rewards.iter().map(|r| r.wins).sum()
    }
}

/// The simulation engine.
///
/// Owns the accounts, the agents, the ledger handle and the random source.
/// All randomness used by the engine (miner creation, batch shuffling,
/// win counts and miner seeds) is drawn from one seeded stream in a fixed
/// order, so a run is reproducible from its configuration.
pub struct Sim<L: Ledger = Vm> {
    config: SimConfig,
    accounts: Vec<Address>,
    agents: Vec<Box<dyn Agent>>,
    ledger: L,
    rng: ChaCha8Rng,
    call_stats: CallStatistics,
    /// Accounts promoted to miners so far, taken from the front
    promoted: usize,
    /// Accounts handed to account agents, taken from the back
    reserved: usize,
}

impl Sim<Vm> {
    /// Creates a simulation over a fresh in-memory ledger.
    pub fn with_memory_ledger(config: SimConfig) -> Result<Self, SimError> {
        let vm = Vm::new().map_err(SimError::Initialization)?;
        Self::new(config, vm)
    }
}

impl<L: Ledger> Sim<L> {
    /// Creates the configured accounts on `ledger` and seeds the random source.
    pub fn new(config: SimConfig, mut ledger: L) -> Result<Self, SimError> {
        let accounts = ledger
            .create_accounts(config.account_count, config.account_initial_balance, config.seed)
            .map_err(SimError::Initialization)?;

        info!(
            seed = config.seed,
            accounts = accounts.len(),
            balance = %config.account_initial_balance,
            "simulation initialized"
        );

        // Account creation is not part of any tick
        let ledger = ledger.with_epoch(ledger.epoch()).map_err(SimError::Initialization)?;

        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            accounts,
            agents: Vec::new(),
            ledger,
            call_stats: CallStatistics::new(),
            promoted: 0,
            reserved: 0,
        })
    }

    // =========================================================================
    // TICK
    // =========================================================================

    /// Runs one epoch.
    ///
    /// Any failure aborts the tick: the ledger keeps the messages applied
    /// so far and stays at the current epoch.
    pub fn tick(&mut self) -> Result<TickReport, SimError> {
        let epoch = self.ledger.epoch();

        // Power is observed before this epoch's messages
        let power_table = compute_power_table(&self.ledger, &self.agents)?;

        let mut batch: Vec<Message> = Vec::new();
        for agent in self.agents.iter_mut() {
            let messages = agent.tick(&self.ledger).map_err(|source| SimError::Agent {
                agent: agent.name().to_string(),
                source,
            })?;
            batch.extend(messages);
        }

        // At most one new miner per epoch. The account counts as promoted
        // only once its message applies, so an aborted tick retries it.
        let mut promoting = None;
        if self.promoted < self.promotable() && self.rng.gen::<f32>() < self.config.create_miner_probability {
            let owner = self.accounts[self.promoted];
            promoting = Some(owner);
            batch.push(self.create_miner_message(owner));
        }

        batch.shuffle(&mut self.rng);

        let mut applied = Vec::with_capacity(batch.len());
        let mut agents_joined = 0;
        for (position, mut msg) in batch.into_iter().enumerate() {
            let ret = self.apply(&msg, TickPhase::Batch { position })?;
            let promotes = promoting.is_some_and(|owner| is_create_miner(&msg, owner));
            if let Some(handler) = msg.return_handler.take() {
                let joined = handler(&self.ledger, &msg, &ret).map_err(|source| SimError::Agent {
                    agent: format!("return handler of batch message #{}", position),
                    source,
                })?;
                if let Some(agent) = joined {
                    info!(epoch, agent = agent.name(), miner = ?agent.miner_address(), "agent joined");
                    self.agents.push(agent);
                    agents_joined += 1;
                }
            }
            if promotes {
                self.promoted += 1;
                promoting = None;
            }
            applied.push(msg.summary());
        }

        let mut rewards = Vec::new();
        if power_table.total_qa_power.is_positive() {
            for entry in &power_table.miners {
                let wins = win_count(entry.qa_power, power_table.total_qa_power, &mut self.rng);
                if self.reward_miner(entry.address, wins)? {
                    rewards.push(BlockReward {
                        miner: entry.address,
                        wins,
                    });
                }
            }
        }

        let cron_tick = Message::new(
            SYSTEM_ACTOR_ADDR,
            CRON_ACTOR_ADDR,
            TokenAmount::zero(),
            cron::EPOCH_TICK,
            MethodParams::None,
        );
        self.apply(&cron_tick, TickPhase::Cron)?;

        self.call_stats = self.ledger.call_stats();
        self.ledger = self.ledger.with_epoch(epoch + 1).map_err(SimError::EpochAdvance)?;

        let report = TickReport {
            epoch,
            power_table,
            messages: applied,
            agents_joined,
            rewards,
        };
        info!(
            epoch,
            agents = self.agents.len(),
            messages = report.messages.len(),
            blocks = report.blocks_won(),
            "tick complete"
        );
        Ok(report)
    }

    /// Applies one message, turning a non-OK exit code into an error.
    fn apply(&mut self, msg: &Message, phase: TickPhase) -> Result<ReturnValue, SimError> {
        let (ret, code) = self
            .ledger
            .apply_message(&msg.from, &msg.to, msg.value, msg.method, msg.params.clone());
        if !code.is_success() {
            warn!(%code, %phase, message = %msg.summary(), "message failed");
            return Err(SimError::Execution {
                code,
                phase,
                message: Box::new(msg.summary()),
                log: self.ledger.logs(),
            });
        }
        debug!(%phase, message = %msg.summary(), "applied");
        Ok(ret)
    }

    /// Pays a miner for `wins` blocks. Returns false when there is nothing to pay.
    fn reward_miner(&mut self, miner: Address, wins: u64) -> Result<bool, SimError> {
        if wins < 1 {
            return Ok(false);
        }
        let params = MethodParams::AwardBlockReward(reward::AwardBlockRewardParams {
            miner,
            penalty: TokenAmount::zero(),
            gas_reward: TokenAmount::zero(),
            win_count: wins as i64,
        });
        let msg = Message::new(
            SYSTEM_ACTOR_ADDR,
            REWARD_ACTOR_ADDR,
            TokenAmount::zero(),
            reward::AWARD_BLOCK_REWARD,
            params,
        );
        self.apply(&msg, TickPhase::Reward)?;
        debug!(miner = %miner, wins, "block reward");
        Ok(true)
    }

    /// The message that turns `owner` into a miner; its return handler
    /// creates the miner agent.
    fn create_miner_message(&mut self, owner: Address) -> Message {
        let config = MinerAgentConfig {
            starting_balance: self.config.account_initial_balance,
            ..self.config.miner.clone()
        };
        let params = MethodParams::CreateMiner(power::CreateMinerParams {
            owner,
            worker: owner,
            seal_proof_type: config.proof_type,
        });
        let seed = self.rng.next_u64();

        // The miner gets all of the account's funds
        Message::new(
            owner,
            STORAGE_POWER_ACTOR_ADDR,
            config.starting_balance,
            power::CREATE_MINER,
            params,
        )
        .with_return_handler(move |_, msg, ret| {
            let created = match ret {
                ReturnValue::CreateMiner(created) => created,
                other => {
                    return Err(AgentError::UnexpectedReturn {
                        expected: "CreateMiner",
                        got: format!("{:?}", other),
                    })
                }
            };
            let params = match &msg.params {
                MethodParams::CreateMiner(params) => params,
                other => {
                    return Err(AgentError::UnexpectedReturn {
                        expected: "CreateMiner params",
                        got: other.kind().to_string(),
                    })
                }
            };
            let agent = MinerAgent::new(
                params.owner,
                params.worker,
                created.id_address,
                created.robust_address,
                seed,
                config,
            )?;
            Ok(Some(Box::new(agent) as Box<dyn Agent>))
        })
    }

    /// Accounts not reserved for account agents, promoted or not.
    fn promotable(&self) -> usize {
        self.accounts.len() - self.reserved
    }

    // =========================================================================
    // HARNESS
    // =========================================================================

    /// Adds an agent between ticks.
    pub fn add_agent(&mut self, agent: Box<dyn Agent>) {
        self.agents.push(agent);
    }

    /// Hands the last `count` unused accounts to account agents that trade
    /// among themselves. These accounts are never promoted to miners.
    /// Returns the number of agents added.
    pub fn spawn_account_agents(&mut self, count: usize, config: AccountAgentConfig) -> usize {
        let available = self.promotable() - self.promoted;
        let count = count.min(available);
        if count == 0 {
            return 0;
        }

        let end = self.accounts.len() - self.reserved;
        let group: Vec<Address> = self.accounts[end - count..end].to_vec();
        for address in &group {
            let seed = self.rng.next_u64();
            self.agents
                .push(Box::new(AccountAgent::new(*address, group.clone(), seed, config.clone())));
        }
        self.reserved += count;
        info!(count, "account agents spawned");
        count
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// All accounts created at genesis, including promoted ones.
    pub fn accounts(&self) -> &[Address] {
        &self.accounts
    }

    pub fn agents(&self) -> &[Box<dyn Agent>] {
        &self.agents
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Number of agents operating a miner.
    pub fn miner_count(&self) -> usize {
        self.agents.iter().filter(|a| a.miner_address().is_some()).count()
    }

    /// The current ledger handle.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Call statistics of the last completed tick.
    pub fn call_stats(&self) -> &CallStatistics {
        &self.call_stats
    }

    pub fn epoch(&self) -> ChainEpoch {
        self.ledger.epoch()
    }

    /// Builds the power table for the current ledger state.
    pub fn power_table(&self) -> Result<PowerTable, SimError> {
        compute_power_table(&self.ledger, &self.agents)
    }
}

/// Whether `msg` is the engine's request to turn `owner` into a miner.
fn is_create_miner(msg: &Message, owner: Address) -> bool {
    msg.from == owner
        && msg.to == STORAGE_POWER_ACTOR_ADDR
        && msg.method == power::CREATE_MINER
        && msg.return_handler.is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use powersim_actors::ExitCode;
    use powersim_vm::LedgerStateExt;

    fn config(accounts: usize, probability: f32) -> SimConfig {
        SimConfig {
            account_count: accounts,
            account_initial_balance: TokenAmount::new(1000),
            seed: 42,
            create_miner_probability: probability,
            miner: MinerAgentConfig {
                precommit_rate: 0.5,
                proof_type: powersim_actors::RegisteredSealProof::StackedDrg2KiBV1_1,
                starting_balance: TokenAmount::zero(),
            },
        }
    }

    /// Emits a fixed list of messages once.
    struct Scripted(Vec<Message>);

    impl Agent for Scripted {
        fn tick(&mut self, _state: &dyn LedgerState) -> Result<Vec<Message>, AgentError> {
            Ok(std::mem::take(&mut self.0))
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    #[test]
    fn test_first_tick_creates_one_miner() {
        let mut sim = Sim::with_memory_ledger(config(3, 1.0)).unwrap();
        let report = sim.tick().unwrap();

        assert_eq!(sim.agent_count(), 1);
        assert_eq!(report.agents_joined, 1);
        assert_eq!(sim.accounts().len(), 3);
        assert_eq!(sim.epoch(), 1);

        let miner = sim.agents()[0].miner_address().unwrap();
        assert_eq!(sim.ledger().balance(&miner), TokenAmount::new(1000));
        assert!(sim.ledger().balance(&sim.accounts()[0]).is_zero());

        let st: power::State = sim.ledger().get_state(&STORAGE_POWER_ACTOR_ADDR).unwrap();
        assert_eq!(st.miner_count, 1);
    }

    #[test]
    fn test_miners_bounded_by_accounts() {
        let mut sim = Sim::with_memory_ledger(config(3, 1.0)).unwrap();
        for _ in 0..6 {
            let before = sim.agent_count();
            sim.tick().unwrap();
            assert!(sim.agent_count() - before <= 1);
        }
        assert_eq!(sim.miner_count(), 3);
    }

    #[test]
    fn test_no_miners_without_probability() {
        let mut sim = Sim::with_memory_ledger(config(3, 0.0)).unwrap();
        for _ in 0..5 {
            sim.tick().unwrap();
        }
        assert_eq!(sim.agent_count(), 0);
        assert_eq!(sim.epoch(), 5);
    }

    #[test]
    fn test_cron_runs_every_tick() {
        let mut sim = Sim::with_memory_ledger(config(1, 0.0)).unwrap();
        for _ in 0..3 {
            sim.tick().unwrap();
        }
        let st: reward::State = sim.ledger().get_state(&REWARD_ACTOR_ADDR).unwrap();
        assert_eq!(st.effective_network_time, 3);
        assert_eq!(
            sim.call_stats()
                .get(&powersim_vm::MethodKey::new(powersim_actors::ActorCode::Cron, cron::EPOCH_TICK))
                .map(|s| s.calls),
            Some(1)
        );
    }

    #[test]
    fn test_failing_message_aborts_tick() {
        let mut sim = Sim::with_memory_ledger(config(2, 0.0)).unwrap();
        let (a, b) = (sim.accounts()[0], sim.accounts()[1]);
        sim.add_agent(Box::new(Scripted(vec![Message::new(
            a,
            b,
            TokenAmount::new(5000),
            powersim_actors::builtin::METHOD_SEND,
            MethodParams::None,
        )])));

        let err = sim.tick().unwrap_err();
        assert_eq!(err.exit_code(), Some(ExitCode::SYS_ERR_INSUFFICIENT_FUNDS));
        match err {
            SimError::Execution { phase, message, log, .. } => {
                assert_eq!(phase, TickPhase::Batch { position: 0 });
                assert_eq!(message.from, a);
                assert!(!log.is_empty());
            }
            other => panic!("unexpected error {:?}", other),
        }
        // No epoch advance
        assert_eq!(sim.epoch(), 0);
    }

    #[test]
    fn test_account_agents_are_not_promoted() {
        let mut sim = Sim::with_memory_ledger(config(4, 1.0)).unwrap();
        assert_eq!(sim.spawn_account_agents(2, AccountAgentConfig::default()), 2);
        for _ in 0..5 {
            sim.tick().unwrap();
        }
        assert_eq!(sim.miner_count(), 2);
        assert_eq!(sim.agent_count(), 4);
        assert_eq!(sim.spawn_account_agents(5, AccountAgentConfig::default()), 0);
    }
}
