//! Scenario runner - executes named simulation scenarios and checks
//! ledger-wide invariants after every tick.

use crate::account::AccountAgentConfig;
use crate::exporter::{EpochFrame, SimExport};
use crate::miner::MinerAgentConfig;
use crate::scenarios::ScenarioId;
use crate::sim::{Sim, SimConfig, TickReport};
use powersim_actors::builtin::{reward, METHOD_SEND, REWARD_ACTOR_ADDR};
use powersim_actors::{RegisteredSealProof, TokenAmount};
use powersim_vm::{LedgerState, LedgerStateExt, Vm};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Ticks completed
    pub total_ticks: u64,

    /// Ledger epoch at the end of the run
    pub final_epoch: i64,

    /// Number of agents at the end
    pub final_agent_count: usize,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScenarioMetrics {
    /// Miner agents at the end of the run
    pub miners: usize,

    /// Batch messages applied
    pub messages_applied: u64,

    /// Plain value transfers among them
    pub transfers: u64,

    /// Blocks won across all miners
    pub blocks_won: u64,

    /// Funds paid out by the reward actor
    pub rewards_paid: TokenAmount,
}

/// Runs simulation scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Epoch count override
    epochs: Option<u64>,

    /// Configuration override, replacing the scenario's own
    config: Option<SimConfig>,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            epochs: None,
            config: None,
        }
    }

    /// Sets the number of epochs every scenario runs.
    pub fn with_epochs(mut self, epochs: u64) -> Self {
        self.epochs = Some(epochs);
        self
    }

    /// Replaces the scenarios' configuration. The runner's seed still applies.
    pub fn with_config(mut self, config: SimConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Configuration a scenario starts from.
    pub fn scenario_config(&self, scenario: ScenarioId) -> SimConfig {
        if let Some(config) = &self.config {
            return SimConfig {
                seed: self.seed,
                ..config.clone()
            };
        }

        let small_miner = |balance: i128, rate: f64| SimConfig {
            account_initial_balance: TokenAmount::new(balance),
            seed: self.seed,
            miner: MinerAgentConfig {
                precommit_rate: rate,
                proof_type: RegisteredSealProof::StackedDrg2KiBV1_1,
                starting_balance: TokenAmount::zero(),
            },
            ..SimConfig::default()
        };

        match scenario {
            ScenarioId::Genesis => SimConfig {
                account_count: 5,
                create_miner_probability: 0.0,
                ..small_miner(1_000, 1.0)
            },
            ScenarioId::MinerGrowth => SimConfig {
                account_count: 8,
                create_miner_probability: 1.0,
                ..small_miner(100, 0.5)
            },
            ScenarioId::SteadyState => SimConfig {
                account_count: 4,
                create_miner_probability: 1.0,
                ..small_miner(40, 1.0)
            },
            ScenarioId::BusyAccounts => SimConfig {
                account_count: 8,
                create_miner_probability: 0.5,
                ..small_miner(1_000, 0.5)
            },
        }
    }

    pub fn epochs_for(&self, scenario: ScenarioId) -> u64 {
        self.epochs.unwrap_or_else(|| scenario.default_epochs())
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        self.execute(scenario, None)
    }

    /// Runs a scenario and records one frame per epoch.
    pub fn run_recorded(&self, scenario: ScenarioId) -> (ScenarioResult, SimExport) {
        let mut export = SimExport::new(scenario.name(), self.scenario_config(scenario));
        let result = self.execute(scenario, Some(&mut export));
        export.finalize(result.passed, result.failure_reason.clone());
        (result, export)
    }

    fn execute(&self, scenario: ScenarioId, mut export: Option<&mut SimExport>) -> ScenarioResult {
        let config = self.scenario_config(scenario);
        let epochs = self.epochs_for(scenario);
        info!("Starting scenario: {} (seed={}, epochs={})", scenario.name(), self.seed, epochs);

        let mut result = ScenarioResult {
            scenario,
            seed: self.seed,
            passed: false,
            total_ticks: 0,
            final_epoch: 0,
            final_agent_count: 0,
            failure_reason: None,
            metrics: ScenarioMetrics::default(),
        };

        let mut sim = match Sim::with_memory_ledger(config) {
            Ok(sim) => sim,
            Err(e) => {
                result.failure_reason = Some(e.to_string());
                return result;
            }
        };
        if scenario == ScenarioId::BusyAccounts {
            let count = sim.accounts().len() / 2;
            sim.spawn_account_agents(count, AccountAgentConfig::default());
        }

        let mut checker = match InvariantChecker::new(&sim) {
            Ok(checker) => checker,
            Err(reason) => {
                result.failure_reason = Some(reason);
                return result;
            }
        };

        let mut failure = None;
        for _ in 0..epochs {
            let agents_before = sim.agent_count();
            let report = match sim.tick() {
                Ok(report) => report,
                Err(e) => {
                    failure = Some(e.to_string());
                    break;
                }
            };
            result.total_ticks += 1;
            record(&mut result.metrics, &report);

            if let Some(export) = export.as_deref_mut() {
                export.add_frame(EpochFrame::new(&report, sim.agent_count(), sim.call_stats().summary()));
            }

            if let Err(reason) = checker.check(&sim, &report, agents_before) {
                failure = Some(format!("epoch {}: {}", report.epoch, reason));
                break;
            }
        }

        result.final_epoch = sim.epoch();
        result.final_agent_count = sim.agent_count();
        result.metrics.miners = sim.miner_count();
        result.metrics.rewards_paid = checker.rewards_paid(&sim);

        if failure.is_none() && result.total_ticks == epochs {
            failure = check_outcome(scenario, &sim, &result).err();
        }

        match &failure {
            None => info!(
                "{} finished: epoch={} agents={} blocks={}",
                scenario.name(),
                result.final_epoch,
                result.final_agent_count,
                result.metrics.blocks_won
            ),
            Some(reason) => warn!("{} failed: {}", scenario.name(), reason),
        }
        result.passed = failure.is_none();
        result.failure_reason = failure;
        result
    }
}

fn record(metrics: &mut ScenarioMetrics, report: &TickReport) {
    metrics.messages_applied += report.messages.len() as u64;
    metrics.transfers += report.messages.iter().filter(|m| m.method == METHOD_SEND).count() as u64;
    metrics.blocks_won += report.blocks_won();
}

// =============================================================================
// INVARIANTS
// =============================================================================

/// Ledger-wide properties that must hold after every tick.
struct InvariantChecker {
    total_balance: TokenAmount,
    initial_reward_balance: TokenAmount,
    reward_balance: TokenAmount,
    reward_epochs: i64,
}

impl InvariantChecker {
    fn new(sim: &Sim<Vm>) -> Result<Self, String> {
        let reward_balance = sim.ledger().balance(&REWARD_ACTOR_ADDR);
        let st: reward::State = sim
            .ledger()
            .get_state(&REWARD_ACTOR_ADDR)
            .map_err(|e| format!("reward state unreadable: {}", e))?;
        Ok(Self {
            total_balance: sim.ledger().total_balance(),
            initial_reward_balance: reward_balance,
            reward_balance,
            reward_epochs: st.effective_network_time,
        })
    }

    fn check(&mut self, sim: &Sim<Vm>, report: &TickReport, agents_before: usize) -> Result<(), String> {
        let ledger = sim.ledger();

        if report.agents_joined > 1 || sim.agent_count() > agents_before + 1 {
            return Err(format!("{} agents joined in one tick", sim.agent_count() - agents_before));
        }

        let listed = report.power_table.listed_power();
        if listed > report.power_table.total_qa_power {
            return Err(format!(
                "listed power {} exceeds network power {}",
                listed, report.power_table.total_qa_power
            ));
        }

        for paid in &report.rewards {
            let listed = report.power_table.miners.iter().find(|m| m.address == paid.miner);
            match listed {
                Some(entry) if entry.qa_power.is_positive() => {}
                _ => return Err(format!("miner {} rewarded without power", paid.miner)),
            }
        }

        let total = ledger.total_balance();
        if total != self.total_balance {
            return Err(format!("total balance changed from {} to {}", self.total_balance, total));
        }

        let reward_balance = ledger.balance(&REWARD_ACTOR_ADDR);
        if reward_balance > self.reward_balance {
            return Err(format!(
                "reward balance grew from {} to {}",
                self.reward_balance, reward_balance
            ));
        }
        self.reward_balance = reward_balance;

        // Cron ran exactly once
        let st: reward::State = ledger
            .get_state(&REWARD_ACTOR_ADDR)
            .map_err(|e| format!("reward state unreadable: {}", e))?;
        if st.effective_network_time != self.reward_epochs + 1 {
            return Err(format!(
                "network time {} after {} cron ticks",
                st.effective_network_time,
                self.reward_epochs + 1
            ));
        }
        self.reward_epochs = st.effective_network_time;

        if ledger.epoch() != report.epoch + 1 {
            return Err(format!("ledger at epoch {} after tick {}", ledger.epoch(), report.epoch));
        }

        debug!(epoch = report.epoch, "invariants hold");
        Ok(())
    }

    fn rewards_paid(&self, sim: &Sim<Vm>) -> TokenAmount {
        self.initial_reward_balance - sim.ledger().balance(&REWARD_ACTOR_ADDR)
    }
}

/// Scenario-specific expectations for a run that completed every epoch.
fn check_outcome(scenario: ScenarioId, sim: &Sim<Vm>, result: &ScenarioResult) -> Result<(), String> {
    let metrics = &result.metrics;
    match scenario {
        ScenarioId::Genesis => {
            if result.final_agent_count != 0 {
                return Err(format!("{} agents without miner creation", result.final_agent_count));
            }
            if metrics.messages_applied != 0 {
                return Err(format!("{} messages on an idle network", metrics.messages_applied));
            }
        }
        ScenarioId::MinerGrowth => {
            let expected = sim.accounts().len().min(result.total_ticks as usize);
            if metrics.miners != expected {
                return Err(format!("expected {} miners, found {}", expected, metrics.miners));
            }
        }
        ScenarioId::SteadyState => {
            if metrics.blocks_won == 0 {
                return Err("no blocks won after sectors were proven".to_string());
            }
            if !metrics.rewards_paid.is_positive() {
                return Err("reward actor paid nothing".to_string());
            }
            let table = sim.power_table().map_err(|e| e.to_string())?;
            if !table.total_qa_power.is_positive() {
                return Err("network has no power".to_string());
            }
        }
        ScenarioId::BusyAccounts => {
            let promotable = sim.accounts().len() - sim.accounts().len() / 2;
            if metrics.miners > promotable {
                return Err(format!("{} miners from {} promotable accounts", metrics.miners, promotable));
            }
            if metrics.transfers == 0 {
                return Err("account agents never transferred funds".to_string());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genesis_passes() {
        let result = ScenarioRunner::new(42).run(ScenarioId::Genesis);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.total_ticks, 20);
        assert_eq!(result.final_epoch, 20);
    }

    #[test]
    fn test_config_override_keeps_runner_seed() {
        let runner = ScenarioRunner::new(7).with_config(SimConfig::default());
        assert_eq!(runner.scenario_config(ScenarioId::Genesis).seed, 7);
        assert_eq!(runner.scenario_config(ScenarioId::SteadyState).account_count, 20);
    }

    #[test]
    fn test_recorded_run_has_frame_per_epoch() {
        let runner = ScenarioRunner::new(3).with_epochs(12);
        let (result, export) = runner.run_recorded(ScenarioId::MinerGrowth);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(export.epochs.len(), 12);
        assert_eq!(export.epochs.last().map(|f| f.agents), Some(8));
        assert!(export.passed);
    }
}
