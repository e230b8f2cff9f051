//! Per-method call statistics.

use powersim_actors::{ActorCode, MethodNum};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifies an invoked method by actor type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MethodKey {
    pub code: ActorCode,
    pub method: MethodNum,
}

impl MethodKey {
    pub fn new(code: ActorCode, method: MethodNum) -> Self {
        Self { code, method }
    }

    /// e.g. `storagepower.CreateMiner`
    pub fn name(&self) -> String {
        format!("{}.{}", self.code.name(), self.code.method_name(self.method))
    }
}

/// Counters for one method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallStats {
    /// Invocations, including failed ones
    pub calls: u64,
    /// State objects loaded
    pub reads: u64,
    pub read_bytes: u64,
    /// State objects stored
    pub writes: u64,
    pub write_bytes: u64,
}

impl CallStats {
    fn merge(&mut self, other: &CallStats) {
        self.calls += other.calls;
        self.reads += other.reads;
        self.read_bytes += other.read_bytes;
        self.writes += other.writes;
        self.write_bytes += other.write_bytes;
    }
}

/// One row of a statistics report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodCallSummary {
    pub method: String,
    #[serde(flatten)]
    pub stats: CallStats,
}

/// Call statistics keyed by (actor type, method).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallStatistics {
    entries: BTreeMap<MethodKey, CallStats>,
}

impl CallStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_call(&mut self, key: MethodKey) {
        self.entries.entry(key).or_default().calls += 1;
    }

    pub fn record_read(&mut self, key: MethodKey, bytes: usize) {
        let stats = self.entries.entry(key).or_default();
        stats.reads += 1;
        stats.read_bytes += bytes as u64;
    }

    pub fn record_write(&mut self, key: MethodKey, bytes: usize) {
        let stats = self.entries.entry(key).or_default();
        stats.writes += 1;
        stats.write_bytes += bytes as u64;
    }

    pub fn get(&self, key: &MethodKey) -> Option<&CallStats> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MethodKey, &CallStats)> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total invocations across all methods.
    pub fn total_calls(&self) -> u64 {
        self.entries.values().map(|s| s.calls).sum()
    }

    /// Adds another set of statistics into this one.
    pub fn merge(&mut self, other: &CallStatistics) {
        for (key, stats) in &other.entries {
            self.entries.entry(*key).or_default().merge(stats);
        }
    }

    /// Flattens into named rows, ordered by actor type then method.
    pub fn summary(&self) -> Vec<MethodCallSummary> {
        self.entries
            .iter()
            .map(|(key, stats)| MethodCallSummary {
                method: key.name(),
                stats: *stats,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_merge() {
        let create = MethodKey::new(ActorCode::StoragePower, 2);
        let send = MethodKey::new(ActorCode::Account, 0);

        let mut a = CallStatistics::new();
        a.record_call(create);
        a.record_read(create, 100);
        a.record_write(create, 40);

        let mut b = CallStatistics::new();
        b.record_call(create);
        b.record_call(send);

        a.merge(&b);
        assert_eq!(a.total_calls(), 3);
        let stats = a.get(&create).unwrap();
        assert_eq!(stats.calls, 2);
        assert_eq!(stats.read_bytes, 100);
        assert_eq!(stats.write_bytes, 40);
    }

    #[test]
    fn test_summary_names() {
        let mut stats = CallStatistics::new();
        stats.record_call(MethodKey::new(ActorCode::StoragePower, 2));
        stats.record_call(MethodKey::new(ActorCode::Account, 0));

        let rows = stats.summary();
        let names: Vec<_> = rows.iter().map(|r| r.method.as_str()).collect();
        assert_eq!(names, vec!["account.Send", "storagepower.CreateMiner"]);
    }
}
