//! Error types shared by the node's activities and their collaborators.
//!
//! Collaborator errors (`CameraError`, `StorageError`, `CellError`,
//! `TransportError`, `DecodeError`) describe what an external device or
//! channel reported. `NodeError` is the taxonomy the activities surface to the
//! scheduler; none of its variants stop the scheduler.

use thiserror::Error;

use crate::bootstrap::BootstrapTask;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("camera init failed: {0}")]
    Init(String),
    #[error("camera returned no frame: {0}")]
    NoFrame(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage not mounted")]
    NotMounted,
    #[error("no card attached at {0}")]
    NoCard(String),
    #[error("no log file allocated")]
    NoLogFile,
    #[error("{op} {path} failed: {source}")]
    Io {
        op: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    pub fn io(op: &'static str, path: impl Into<String>, source: std::io::Error) -> Self {
        StorageError::Io {
            op,
            path: path.into(),
            source,
        }
    }
}

#[derive(Error, Debug)]
pub enum CellError {
    #[error("sequence cell not initialized")]
    NotInitialized,
    #[error("sequence cell holds {len} byte(s), expected {size}")]
    Corrupt { len: usize, size: usize },
    #[error("slot {slot} out of range (size {size})")]
    OutOfRange { slot: usize, size: usize },
    #[error("sequence cell io failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("no route to node {0}")]
    NoRoute(u32),
    #[error("transport io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("transport rejected message: {0}")]
    Rejected(String),
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("message has no type tag")]
    MissingTag,
    #[error("no decoder registered for type {0}")]
    UnknownTag(u64),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    #[error("report buffer is empty")]
    Empty,
}

/// Failures surfaced by the periodic activities.
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("capture failed: {0}")]
    CaptureFailed(#[from] CameraError),
    #[error("failed to write picture {path}: {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: StorageError,
    },
    #[error("failed to commit picture index {index}: {source}")]
    CommitFailed {
        index: u32,
        #[source]
        source: CellError,
    },
    #[error("failed to send report {name} to node {destination}: {source}")]
    SendFailed {
        name: String,
        destination: u32,
        #[source]
        source: TransportError,
    },
    #[error("bootstrap task {task} failed: {reason}")]
    BootstrapFailed { task: BootstrapTask, reason: String },
}
