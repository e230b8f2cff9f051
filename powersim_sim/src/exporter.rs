//! JSON exporter for simulation runs.
//!
//! Writes one frame per epoch so a run can be inspected or diffed offline.

use crate::sim::{BlockReward, SimConfig, TickReport};
use powersim_actors::{ChainEpoch, StoragePower, TokenAmount};
use powersim_vm::MethodCallSummary;
use serde::Serialize;
use std::fs::File;
use std::io::Write;

/// A single epoch of simulation data.
#[derive(Debug, Clone, Serialize)]
pub struct EpochFrame {
    /// Epoch the tick executed at
    pub epoch: ChainEpoch,

    /// Agents after the tick
    pub agents: usize,

    /// Miners listed in the power table
    pub eligible_miners: usize,

    /// Network quality-adjusted power at the start of the epoch
    pub total_qa_power: StoragePower,

    /// Reward available to the epoch's block producers
    pub block_reward: TokenAmount,

    /// Batch messages applied
    pub messages: usize,

    /// Rewards paid
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rewards: Vec<BlockReward>,

    /// Per-method call statistics of the epoch
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub calls: Vec<MethodCallSummary>,
}

impl EpochFrame {
    pub fn new(report: &TickReport, agents: usize, calls: Vec<MethodCallSummary>) -> Self {
        Self {
            epoch: report.epoch,
            agents,
            eligible_miners: report.power_table.miners.len(),
            total_qa_power: report.power_table.total_qa_power,
            block_reward: report.power_table.block_reward,
            messages: report.messages.len(),
            rewards: report.rewards.clone(),
            calls,
        }
    }
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Configuration the run started from
    pub config: SimConfig,

    /// All frames
    pub epochs: Vec<EpochFrame>,

    /// Final results
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, config: SimConfig) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed: config.seed,
            config,
            epochs: Vec::new(),
            passed: false,
            failure_reason: None,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: EpochFrame) {
        self.epochs.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, failure_reason: Option<String>) {
        self.passed = passed;
        self.failure_reason = failure_reason;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
