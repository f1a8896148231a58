//! Per-environment completion records kept in the key/value store.

use cellsim_core::KeyValueStore;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionStats {
    pub runs: i32,
    pub best_population: i32,
    pub longest_survival_ms: i32,
}

impl CompletionStats {
    fn prefix(environment: &str) -> String {
        format!("env.{}.", environment)
    }

    /// Stored record for `environment`, zeroed when none exists
    pub fn load(store: &dyn KeyValueStore, environment: &str) -> Self {
        let prefix = Self::prefix(environment);
        Self {
            runs: store.get_int(&format!("{}runs", prefix), 0),
            best_population: store.get_int(&format!("{}bestPopulation", prefix), 0),
            longest_survival_ms: store.get_int(&format!("{}longestSurvivalMs", prefix), 0),
        }
    }

    pub fn save(&self, store: &mut dyn KeyValueStore, environment: &str) {
        let prefix = Self::prefix(environment);
        store.set_int(&format!("{}runs", prefix), self.runs);
        store.set_int(&format!("{}bestPopulation", prefix), self.best_population);
        store.set_int(&format!("{}longestSurvivalMs", prefix), self.longest_survival_ms);
    }

    /// Forget everything recorded for `environment`
    pub fn clear(store: &mut dyn KeyValueStore, environment: &str) -> usize {
        store.remove_all_by_prefix(&Self::prefix(environment))
    }

    /// Fold one finished run into the record
    pub fn record_run(&mut self, population: usize, longest_survival_secs: f64) {
        self.runs = self.runs.saturating_add(1);
        self.best_population = self.best_population.max(population.min(i32::MAX as usize) as i32);
        let ms = (longest_survival_secs * 1000.0).clamp(0.0, i32::MAX as f64) as i32;
        self.longest_survival_ms = self.longest_survival_ms.max(ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellsim_core::MemoryStore;

    #[test]
    fn test_load_missing_is_zero() {
        let store = MemoryStore::new();
        assert_eq!(CompletionStats::load(&store, "pond"), CompletionStats::default());
    }

    #[test]
    fn test_record_keeps_best() {
        let mut stats = CompletionStats::default();
        stats.record_run(12, 4.5);
        stats.record_run(7, 9.25);
        assert_eq!(stats.runs, 2);
        assert_eq!(stats.best_population, 12);
        assert_eq!(stats.longest_survival_ms, 9250);
    }

    #[test]
    fn test_save_load_and_clear() {
        let mut store = MemoryStore::new();
        let mut stats = CompletionStats::default();
        stats.record_run(3, 1.0);
        stats.save(&mut store, "pond");
        CompletionStats::default().save(&mut store, "lake");

        assert_eq!(CompletionStats::load(&store, "pond"), stats);
        assert_eq!(CompletionStats::clear(&mut store, "pond"), 3);
        assert_eq!(CompletionStats::load(&store, "pond"), CompletionStats::default());
        assert!(store.has_key("env.lake.runs"));
    }
}
