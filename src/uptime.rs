use chrono::{DateTime, Utc};
use std::time::Instant;

use crate::error::StorageError;
use crate::storage::BlockStorage;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Appends `<timestamp> <minutes> min` liveness lines to the run's uptime log.
pub struct UptimeLogger {
    started: Instant,
    path: Option<String>,
}

impl UptimeLogger {
    pub fn new(started: Instant) -> Self {
        Self {
            started,
            path: None,
        }
    }

    pub fn set_path(&mut self, path: Option<String>) {
        self.path = path;
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn uptime_minutes(&self) -> f64 {
        self.started.elapsed().as_secs_f64() / 60.0
    }

    pub fn tick(&self, storage: &mut dyn BlockStorage) -> Result<(), StorageError> {
        self.log_at(storage, Utc::now(), self.uptime_minutes())
    }

    fn log_at(
        &self,
        storage: &mut dyn BlockStorage,
        now: DateTime<Utc>,
        minutes: f64,
    ) -> Result<(), StorageError> {
        let Some(path) = self.path.as_deref() else {
            log_warn!("no uptime log allocated, skipping entry");
            return Err(StorageError::NoLogFile);
        };
        let entry = format_entry(now, minutes);
        match storage.append(path, &entry) {
            Ok(()) => {
                log_info!("appended uptime \"{minutes:.2} min\" to {path}");
                Ok(())
            }
            Err(err) => {
                log_warn!("failed to append to {path}: {err}");
                Err(err)
            }
        }
    }
}

fn format_entry(now: DateTime<Utc>, minutes: f64) -> String {
    format!("{} {minutes:.2} min\n", now.to_rfc3339())
}
