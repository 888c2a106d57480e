//! One-shot startup tasks and the gate they hold over periodic activities.
//!
//! `PeripheralInit` must finish before `StorageInit` may start, and capture
//! plus uptime logging stay disabled until `StorageInit` is done. A failed
//! task stays failed: nothing retries it until an operator calls
//! [`Bootstrap::retry_failed`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::NodeError;
use crate::sensing::Camera;
use crate::sequence::SequenceStore;
use crate::settings::FrameProfile;
use crate::storage::BlockStorage;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

pub const UPTIME_LOGS_DIR: &str = "/uptimeLogs";
pub const ERROR_LOGS_DIR: &str = "/errorLogs";

pub const NODE_DIRECTORIES: [&str; 4] = [
    crate::sensing::pipeline::PICTURES_DIR,
    crate::sensing::pipeline::REPORTS_DIR,
    UPTIME_LOGS_DIR,
    ERROR_LOGS_DIR,
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum BootstrapTask {
    PeripheralInit,
    StorageInit,
}

impl fmt::Display for BootstrapTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootstrapTask::PeripheralInit => write!(f, "peripheral-init"),
            BootstrapTask::StorageInit => write!(f, "storage-init"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum TaskState {
    #[default]
    Pending,
    Running,
    Done,
    Failed,
}

/// Log files allocated by `StorageInit`. A `None` path means the file could
/// not be created; its writer reports that on every attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageLayout {
    pub uptime_log: Option<String>,
    pub error_log: Option<String>,
}

/// Collaborators the startup tasks act on.
pub struct BootstrapContext<'a> {
    pub camera: &'a mut dyn Camera,
    pub storage: &'a mut dyn BlockStorage,
    pub sequence: &'a mut SequenceStore,
    pub profile: FrameProfile,
}

#[derive(Debug)]
pub enum BootstrapStep {
    /// Nothing runnable: finished, or blocked on a failed task.
    Idle,
    Completed(BootstrapTask),
    Failed(NodeError),
}

#[derive(Debug, Default)]
pub struct Bootstrap {
    peripheral: TaskState,
    storage: TaskState,
    layout: Option<StorageLayout>,
}

impl Bootstrap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, task: BootstrapTask) -> TaskState {
        match task {
            BootstrapTask::PeripheralInit => self.peripheral,
            BootstrapTask::StorageInit => self.storage,
        }
    }

    fn state_mut(&mut self, task: BootstrapTask) -> &mut TaskState {
        match task {
            BootstrapTask::PeripheralInit => &mut self.peripheral,
            BootstrapTask::StorageInit => &mut self.storage,
        }
    }

    pub fn next_runnable(&self) -> Option<BootstrapTask> {
        match (self.peripheral, self.storage) {
            (TaskState::Pending, _) => Some(BootstrapTask::PeripheralInit),
            (TaskState::Done, TaskState::Pending) => Some(BootstrapTask::StorageInit),
            _ => None,
        }
    }

    /// Periodic capture runs only after storage is ready.
    pub fn capture_enabled(&self) -> bool {
        self.storage == TaskState::Done
    }

    pub fn uptime_enabled(&self) -> bool {
        self.storage == TaskState::Done
    }

    pub fn is_complete(&self) -> bool {
        self.peripheral == TaskState::Done && self.storage == TaskState::Done
    }

    pub fn has_failed(&self) -> bool {
        self.peripheral == TaskState::Failed || self.storage == TaskState::Failed
    }

    pub fn layout(&self) -> Option<&StorageLayout> {
        self.layout.as_ref()
    }

    /// Returns failed tasks to `Pending` so the next tick runs them again.
    pub fn retry_failed(&mut self) -> Vec<BootstrapTask> {
        let mut retried = Vec::new();
        for task in [BootstrapTask::PeripheralInit, BootstrapTask::StorageInit] {
            let state = self.state_mut(task);
            if *state == TaskState::Failed {
                *state = TaskState::Pending;
                retried.push(task);
            }
        }
        if !retried.is_empty() {
            log_info!("operator retry requested for {retried:?}");
        }
        retried
    }

    /// Runs at most one task, the next one whose predecessor is done.
    pub fn tick(&mut self, ctx: BootstrapContext<'_>) -> BootstrapStep {
        let Some(task) = self.next_runnable() else {
            return BootstrapStep::Idle;
        };
        *self.state_mut(task) = TaskState::Running;

        let result = match task {
            BootstrapTask::PeripheralInit => init_peripheral(ctx.camera, ctx.profile),
            BootstrapTask::StorageInit => {
                init_storage(ctx.storage, ctx.sequence).map(|layout| {
                    self.layout = Some(layout);
                })
            }
        };

        match result {
            Ok(()) => {
                *self.state_mut(task) = TaskState::Done;
                log_info!("{task} finished");
                if task == BootstrapTask::StorageInit {
                    log_info!("enabling picture capture and uptime logging");
                }
                BootstrapStep::Completed(task)
            }
            Err(reason) => {
                *self.state_mut(task) = TaskState::Failed;
                log_error!("{task} failed, dependents stay disabled: {reason}");
                BootstrapStep::Failed(NodeError::BootstrapFailed { task, reason })
            }
        }
    }
}

fn init_peripheral(camera: &mut dyn Camera, profile: FrameProfile) -> Result<(), String> {
    log_info!(
        "configuring camera: {:?}, quality {}, {} frame buffer(s)",
        profile.frame_size,
        profile.jpeg_quality,
        profile.frame_buffers
    );
    camera.init(profile).map_err(|err| err.to_string())
}

fn init_storage(
    storage: &mut dyn BlockStorage,
    sequence: &mut SequenceStore,
) -> Result<StorageLayout, String> {
    storage
        .mount()
        .map_err(|err| format!("card mount failed: {err}"))?;
    log_info!("card mounted");

    for dir in NODE_DIRECTORIES {
        if storage.exists(dir) {
            log_info!("directory \"{dir}\" already exists");
            continue;
        }
        match storage.mkdir(dir) {
            Ok(()) => log_info!("created directory \"{dir}\""),
            Err(err) => log_warn!("could not create directory \"{dir}\": {err}"),
        }
    }

    let layout = StorageLayout {
        uptime_log: allocate_log(storage, UPTIME_LOGS_DIR, "uptimeLog"),
        error_log: allocate_log(storage, ERROR_LOGS_DIR, "errorLog"),
    };

    sequence
        .begin()
        .map_err(|err| format!("sequence cell init failed: {err}"))?;
    log_info!("sequence cell ready, last picture index {}", sequence.stored());

    Ok(layout)
}

/// First unused `<dir>/<stem><n>.txt` counting from zero, created empty.
pub fn next_log_path(storage: &dyn BlockStorage, dir: &str, stem: &str) -> String {
    let mut number: u32 = 0;
    loop {
        let path = format!("{dir}/{stem}{number}.txt");
        if !storage.exists(&path) {
            return path;
        }
        number += 1;
    }
}

fn allocate_log(storage: &mut dyn BlockStorage, dir: &str, stem: &str) -> Option<String> {
    let path = next_log_path(storage, dir, stem);
    match storage.write(&path, b"") {
        Ok(()) => {
            log_info!("created {path}");
            Some(path)
        }
        Err(err) => {
            log_warn!("failed to create {path}: {err}");
            None
        }
    }
}
