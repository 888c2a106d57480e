mod types;

pub use types::{MetricsSnapshot, PipelineCounters, SystemMetrics};

use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::delivery::DeliveryOutcome;
use crate::error::NodeError;
use crate::sensing::CaptureOutcome;

pub struct MetricsCollector {
    counters: PipelineCounters,
    system: System,
    pid: Pid,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        let mut system = System::new();
        let pid = Pid::from_u32(std::process::id());
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]));

        Self {
            counters: PipelineCounters::default(),
            system,
            pid,
        }
    }

    pub fn counters(&self) -> PipelineCounters {
        self.counters
    }

    pub fn record_capture(&mut self, result: &Result<CaptureOutcome, NodeError>) {
        let c = &mut self.counters;
        match result {
            Ok(outcome) => {
                c.captures += 1;
                if outcome.commit_error().is_some() {
                    c.commit_failures += 1;
                }
                match outcome {
                    CaptureOutcome::Discarded { .. } => c.discarded += 1,
                    CaptureOutcome::Enqueued { evicted, .. } => {
                        c.enqueued += 1;
                        if evicted.is_some() {
                            c.dropped += 1;
                        }
                    }
                }
            }
            Err(NodeError::CaptureFailed(_)) => c.capture_failures += 1,
            Err(NodeError::WriteFailed { .. }) => {
                c.captures += 1;
                c.write_failures += 1;
            }
            Err(_) => {}
        }
    }

    pub fn record_delivery(&mut self, outcome: &DeliveryOutcome) {
        match outcome {
            DeliveryOutcome::Idle => {}
            DeliveryOutcome::Delivered(_) => self.counters.sent += 1,
            DeliveryOutcome::Retained(_) => self.counters.send_failures += 1,
        }
    }

    pub fn snapshot(&mut self, pending_reports: usize) -> MetricsSnapshot {
        let pid = self.pid;
        self.system.refresh_processes(ProcessesToUpdate::Some(&[pid]));

        let memory_mb = self
            .system
            .process(pid)
            .map(|process| process.memory() as f64 / 1024.0 / 1024.0)
            .unwrap_or(0.0);

        MetricsSnapshot {
            system: SystemMetrics { memory_mb },
            counters: self.counters,
            pending_reports,
        }
    }
}
