//! PowerSim - deterministic actor simulation harness
//!
//! This crate drives a ledger of built-in actors forward one epoch at a
//! time. Autonomous agents observe the ledger and propose messages; the
//! engine applies them in a seeded random order, distributes block rewards
//! by Poisson leader election, and ends every epoch with a cron tick.
//!
//! # Core Principle: One Random Stream
//!
//! All sources of non-determinism are drawn from seeded generators:
//! - **Engine**: miner creation, batch order, win counts and agent seeds
//! - **Agents**: each owns a generator seeded by the engine
//! - **Accounts**: key material derived from the configuration seed
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                            Sim                              │
//! │  ┌───────────────────────────────────────────────────────┐  │
//! │  │ Ledger (powersim_vm::Vm)  epoch N ──with_epoch──► N+1 │  │
//! │  └───────────────────────────────────────────────────────┘  │
//! │       ▲ apply                  │ read                       │
//! │       │                   ┌────▼────┐                       │
//! │  ┌────┴─────┐  messages   │  Agent  │  miner / account ...  │
//! │  │ shuffled │◄────────────│  tick   │                       │
//! │  │  batch   │             └─────────┘                       │
//! │  └──────────┘                                               │
//! │       │                                                     │
//! │  ┌────▼──────────────┐   ┌────────────────┐                 │
//! │  │ Power table +     │──►│ Cron EpochTick │                 │
//! │  │ block rewards     │   └────────────────┘                 │
//! │  └───────────────────┘                                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use powersim_sim::{Sim, SimConfig};
//!
//! let config = SimConfig {
//!     seed: 42,
//!     account_count: 10,
//!     ..Default::default()
//! };
//!
//! let mut sim = Sim::with_memory_ledger(config)?;
//! for _ in 0..100 {
//!     let report = sim.tick()?;
//!     println!("epoch {} won {} blocks", report.epoch, report.blocks_won());
//! }
//! ```

mod account;
mod agent;
mod error;
mod message;
mod miner;
mod power_table;
mod sim;
mod win_count;

pub mod exporter;
pub mod runner;
pub mod scenarios;

pub use account::{AccountAgent, AccountAgentConfig};
pub use agent::Agent;
pub use error::{AgentError, SimError, TickPhase};
pub use exporter::{EpochFrame, SimExport};
pub use message::{Message, MessageSummary, ReturnHandler};
pub use miner::{MinerAgent, MinerAgentConfig};
pub use power_table::{compute_power_table, MinerPower, PowerTable};
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use sim::{BlockReward, Sim, SimConfig, TickReport};
pub use win_count::{poisson_pmf, win_count};
