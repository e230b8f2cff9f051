//! Named simulation scenarios.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioId {
    /// SIM-001: No miners, only the end-of-epoch cron
    Genesis,

    /// SIM-002: Every account is promoted to a miner
    MinerGrowth,

    /// SIM-003: Miners prove sectors and start winning blocks
    SteadyState,

    /// SIM-004: Account agents trade alongside growing miners
    BusyAccounts,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Genesis,
            ScenarioId::MinerGrowth,
            ScenarioId::SteadyState,
            ScenarioId::BusyAccounts,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Genesis => "genesis",
            ScenarioId::MinerGrowth => "miner_growth",
            ScenarioId::SteadyState => "steady_state",
            ScenarioId::BusyAccounts => "busy_accounts",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Genesis => "Empty network advances epochs, cron runs once per tick",
            ScenarioId::MinerGrowth => "One account promoted per epoch until all accounts mine",
            ScenarioId::SteadyState => "Miners seal 2KiB sectors past the challenge delay and earn block rewards",
            ScenarioId::BusyAccounts => "Half the accounts transfer funds while the rest become miners",
        }
    }

    /// Epochs the scenario runs when no override is given.
    pub fn default_epochs(&self) -> u64 {
        match self {
            ScenarioId::Genesis => 20,
            ScenarioId::MinerGrowth => 30,
            ScenarioId::SteadyState => 200,
            ScenarioId::BusyAccounts => 60,
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "genesis" | "sim-001" => Ok(ScenarioId::Genesis),
            "miner_growth" | "minergrowth" | "sim-002" => Ok(ScenarioId::MinerGrowth),
            "steady_state" | "steadystate" | "sim-003" => Ok(ScenarioId::SteadyState),
            "busy_accounts" | "busyaccounts" | "sim-004" => Ok(ScenarioId::BusyAccounts),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_parse_back() {
        for id in ScenarioId::all() {
            assert_eq!(id.name().parse::<ScenarioId>(), Ok(id));
            assert_eq!(id.to_string(), id.name());
        }
        assert_eq!("SIM-003".parse::<ScenarioId>(), Ok(ScenarioId::SteadyState));
        assert!("split_brain".parse::<ScenarioId>().is_err());
    }
}
