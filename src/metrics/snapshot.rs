use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplaySnapshot {
    pub hits: u64,
    pub failures: u64,
    pub filtered: u64,
    pub skipped: u64,
    /// Throughput of the last completed report interval.
    pub last_rate: u64,
    pub requests_per_second: f64,
    pub elapsed_seconds: f64,
}

impl ReplaySnapshot {
    /// Lines that reached a worker, whatever happened to them.
    pub fn lines_processed(&self) -> u64 {
        self.hits + self.failures + self.filtered + self.skipped
    }
}
