//! Every named scenario passes its invariants on a handful of seeds.

use powersim_sim::scenarios::ScenarioId;
use powersim_sim::ScenarioRunner;

#[test]
fn test_all_scenarios_pass() {
    let runner = ScenarioRunner::new(42);
    for scenario in ScenarioId::all() {
        let result = runner.run(scenario);
        assert!(
            result.passed,
            "{} failed: {}",
            scenario,
            result.failure_reason.as_deref().unwrap_or("unknown")
        );
        assert_eq!(result.total_ticks, scenario.default_epochs());
    }
}

#[test]
fn test_steady_state_pays_rewards_across_seeds() {
    for seed in [1u64, 2, 3] {
        let result = ScenarioRunner::new(seed).run(ScenarioId::SteadyState);
        assert!(result.passed, "seed {}: {:?}", seed, result.failure_reason);
        assert_eq!(result.metrics.miners, 4);
        assert!(result.metrics.blocks_won > 0);
        assert!(result.metrics.rewards_paid.is_positive());
    }
}

#[test]
fn test_busy_accounts_transfer_funds() {
    let result = ScenarioRunner::new(8).run(ScenarioId::BusyAccounts);
    assert!(result.passed, "{:?}", result.failure_reason);
    assert!(result.metrics.transfers > 0);
    assert!(result.metrics.miners <= 4);
    assert_eq!(result.final_agent_count, 4 + result.metrics.miners);
}

#[test]
fn test_same_seed_same_metrics() {
    let a = ScenarioRunner::new(99).with_epochs(40).run(ScenarioId::BusyAccounts);
    let b = ScenarioRunner::new(99).with_epochs(40).run(ScenarioId::BusyAccounts);
    assert_eq!(a.metrics, b.metrics);
    assert_eq!(a.final_agent_count, b.final_agent_count);
}
