//! PowerSim CLI
//!
//! Run deterministic epoch-by-epoch simulations of the built-in actors.

use clap::Parser;
use powersim_actors::TokenAmount;
use powersim_sim::scenarios::ScenarioId;
use powersim_sim::{ScenarioResult, ScenarioRunner, SimConfig};
use std::path::PathBuf;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// PowerSim deterministic simulation CLI
#[derive(Parser, Debug)]
#[command(name = "powersim")]
#[command(about = "Run deterministic actor simulations", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run (genesis, miner_growth, steady_state, busy_accounts, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Number of consecutive seeds to test (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Epochs per scenario (defaults to each scenario's own)
    #[arg(short, long)]
    epochs: Option<u64>,

    /// JSON file with a full simulation configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of genesis accounts
    #[arg(long)]
    accounts: Option<usize>,

    /// Balance of each genesis account
    #[arg(long)]
    balance: Option<i128>,

    /// Chance per epoch of creating a miner
    #[arg(long)]
    miner_probability: Option<f32>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export per-epoch frames of a single scenario to a JSON file
    #[arg(long)]
    export: Option<String>,
}

impl Args {
    /// Configuration replacing the scenarios' own, if any was requested.
    fn config_override(&self) -> Result<Option<SimConfig>, String> {
        let overrides = self.accounts.is_some() || self.balance.is_some() || self.miner_probability.is_some();
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
                serde_json::from_str::<SimConfig>(&text)
                    .map_err(|e| format!("invalid config {}: {}", path.display(), e))?
            }
            None if overrides => SimConfig::default(),
            None => return Ok(None),
        };

        if let Some(accounts) = self.accounts {
            config.account_count = accounts;
        }
        if let Some(balance) = self.balance {
            config.account_initial_balance = TokenAmount::new(balance);
        }
        if let Some(probability) = self.miner_probability {
            config.create_miner_probability = probability;
        }
        Ok(Some(config))
    }

    fn runner(&self, seed: u64, config: &Option<SimConfig>) -> ScenarioRunner {
        let mut runner = ScenarioRunner::new(seed);
        if let Some(epochs) = self.epochs {
            runner = runner.with_epochs(epochs);
        }
        if let Some(config) = config {
            runner = runner.with_config(config.clone());
        }
        runner
    }
}

fn report(result: &ScenarioResult) {
    if result.passed {
        info!(
            "✓ {} (seed={}) PASSED: epoch={} miners={} blocks={} rewards={}",
            result.scenario.name(),
            result.seed,
            result.final_epoch,
            result.metrics.miners,
            result.metrics.blocks_won,
            result.metrics.rewards_paid
        );
    } else {
        error!(
            "✗ {} (seed={}) FAILED: {}",
            result.scenario.name(),
            result.seed,
            result.failure_reason.as_deref().unwrap_or("unknown")
        );
    }
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        std::process::exit(2);
    }

    if !args.json {
        info!("PowerSim v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    // Parse scenarios
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        match args.scenario.parse() {
            Ok(id) => vec![id],
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!("Available scenarios: genesis, miner_growth, steady_state, busy_accounts, all");
                std::process::exit(1);
            }
        }
    };

    let config = match args.config_override() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1)
    } else {
        args.seed
    };

    // Handle --export mode
    if let Some(export_path) = &args.export {
        if scenarios.len() > 1 {
            eprintln!("Error: --export only supports a single scenario, not 'all'");
            std::process::exit(1);
        }

        let (result, export) = args.runner(base_seed, &config).run_recorded(scenarios[0]);
        report(&result);
        match export.write_to_file(export_path) {
            Ok(()) => info!("Exported {} epochs to {}", export.epochs.len(), export_path),
            Err(e) => {
                error!("Failed to write export: {:?}", e);
                std::process::exit(1);
            }
        }
        if !result.passed {
            std::process::exit(1);
        }
        return;
    }

    // Run simulations
    let mut all_results: Vec<ScenarioResult> = Vec::new();
    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);
        let runner = args.runner(seed, &config);

        for scenario in &scenarios {
            let result = runner.run(*scenario);
            if !args.json {
                report(&result);
            }
            all_results.push(result);
        }
    }

    // Summary
    let total = all_results.len();
    let failed_count = all_results.iter().filter(|r| !r.passed).count();
    let passed = total - failed_count;

    if args.json {
        // JSON output for CI parsing
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "ticks": r.total_ticks,
                    "final_epoch": r.final_epoch,
                    "agents": r.final_agent_count,
                    "metrics": r.metrics,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Failed to encode summary: {}", e);
                std::process::exit(2);
            }
        }
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_count == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed_count, total);
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}
