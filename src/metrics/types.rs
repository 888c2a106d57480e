use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineCounters {
    pub captures: u64,
    pub capture_failures: u64,
    pub write_failures: u64,
    pub commit_failures: u64,
    pub discarded: u64,
    pub enqueued: u64,
    pub dropped: u64,
    pub sent: u64,
    pub send_failures: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemMetrics {
    pub memory_mb: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub system: SystemMetrics,
    pub counters: PipelineCounters,
    pub pending_reports: usize,
}
