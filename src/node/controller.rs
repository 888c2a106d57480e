use std::fmt;
use std::net::SocketAddr;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;

use crate::bootstrap::{Bootstrap, BootstrapContext, BootstrapStep};
use crate::buffer::ReportBuffer;
use crate::delivery::{DeliveryOutcome, DeliveryPump};
use crate::error::{NodeError, StorageError};
use crate::mesh::{MeshMessage, MessageRegistry, Transport, UdpTransport};
use crate::metrics::{MetricsCollector, MetricsSnapshot};
use crate::models::node_prefix;
use crate::sensing::{
    classifier_from_settings, Camera, CaptureOutcome, CapturePipeline, Classifier, ReplayCamera,
    SyntheticCamera,
};
use crate::sequence::SequenceStore;
use crate::settings::{CameraSource, NodeSettings};
use crate::storage::{BlockStorage, FileCell, FsStorage, SequenceCell};
use crate::uptime::UptimeLogger;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// External devices the node drives.
pub struct NodeParts {
    pub camera: Box<dyn Camera>,
    pub classifier: Box<dyn Classifier>,
    pub storage: Box<dyn BlockStorage>,
    pub cell: Box<dyn SequenceCell>,
    pub transport: Box<dyn Transport>,
}

impl NodeParts {
    pub fn from_settings(settings: &NodeSettings) -> Result<Self> {
        let camera: Box<dyn Camera> = match &settings.camera.source {
            CameraSource::Synthetic => Box::new(SyntheticCamera::new()),
            CameraSource::Replay { dir } => Box::new(ReplayCamera::new(dir.clone())),
        };

        let collector: SocketAddr = settings
            .collector_addr
            .parse()
            .with_context(|| format!("invalid collector address {}", settings.collector_addr))?;
        let transport = UdpTransport::bind(&settings.bind_addr)
            .with_context(|| format!("failed to bind {}", settings.bind_addr))?
            .with_route(settings.destination_id, collector);

        Ok(Self {
            camera,
            classifier: classifier_from_settings(&settings.classifier),
            storage: Box::new(FsStorage::new(settings.storage_root.clone())),
            cell: Box::new(FileCell::new(settings.sequence_cell_path.clone())),
            transport: Box::new(transport),
        })
    }
}

/// Owns every component of the node. Each `tick_*` method is one
/// run-to-completion activity; the caller serializes them.
pub struct FieldNode {
    settings: NodeSettings,
    camera: Box<dyn Camera>,
    classifier: Box<dyn Classifier>,
    storage: Box<dyn BlockStorage>,
    transport: Box<dyn Transport>,
    pipeline: CapturePipeline,
    buffer: ReportBuffer,
    pump: DeliveryPump,
    bootstrap: Bootstrap,
    uptime: UptimeLogger,
    error_log: Option<String>,
    registry: MessageRegistry,
    metrics: MetricsCollector,
}

impl FieldNode {
    pub fn new(settings: NodeSettings, parts: NodeParts) -> Self {
        let origin = node_prefix(settings.node_id);
        let pipeline = CapturePipeline::new(
            origin,
            settings.score_threshold,
            SequenceStore::new(parts.cell),
        );

        Self {
            buffer: ReportBuffer::new(settings.buffer_capacity),
            pump: DeliveryPump::new(settings.node_id, settings.destination_id),
            camera: parts.camera,
            classifier: parts.classifier,
            storage: parts.storage,
            transport: parts.transport,
            pipeline,
            bootstrap: Bootstrap::new(),
            uptime: UptimeLogger::new(Instant::now()),
            error_log: None,
            registry: MessageRegistry::default(),
            metrics: MetricsCollector::new(),
            settings,
        }
    }

    pub fn from_settings(settings: NodeSettings) -> Result<Self> {
        let parts = NodeParts::from_settings(&settings)?;
        Ok(Self::new(settings, parts))
    }

    pub fn settings(&self) -> &NodeSettings {
        &self.settings
    }

    pub fn buffer(&self) -> &ReportBuffer {
        &self.buffer
    }

    pub fn bootstrap(&self) -> &Bootstrap {
        &self.bootstrap
    }

    pub fn pipeline(&self) -> &CapturePipeline {
        &self.pipeline
    }

    pub fn uptime_log_path(&self) -> Option<&str> {
        self.uptime.path()
    }

    pub fn capture_enabled(&self) -> bool {
        self.bootstrap.capture_enabled()
    }

    pub fn uptime_enabled(&self) -> bool {
        self.bootstrap.uptime_enabled()
    }

    /// True while some startup task can still make progress.
    pub fn bootstrap_pending(&self) -> bool {
        self.bootstrap.next_runnable().is_some()
    }

    /// Operator action: make failed startup tasks runnable again.
    pub fn retry_bootstrap(&mut self) {
        self.bootstrap.retry_failed();
    }

    pub fn tick_bootstrap(&mut self) -> BootstrapStep {
        let ctx = BootstrapContext {
            camera: self.camera.as_mut(),
            storage: self.storage.as_mut(),
            sequence: self.pipeline.sequence_mut(),
            profile: self.settings.camera.profile(),
        };
        let step = self.bootstrap.tick(ctx);

        match &step {
            BootstrapStep::Completed(_) => {
                if let Some(layout) = self.bootstrap.layout() {
                    self.uptime.set_path(layout.uptime_log.clone());
                    self.error_log = layout.error_log.clone();
                }
            }
            BootstrapStep::Failed(err) => self.journal(err),
            BootstrapStep::Idle => {}
        }
        step
    }

    /// `None` while capture is still gated by startup.
    pub fn tick_capture(&mut self) -> Option<Result<CaptureOutcome, NodeError>> {
        if !self.bootstrap.capture_enabled() {
            return None;
        }

        let result = self.pipeline.run_cycle(
            self.camera.as_mut(),
            self.classifier.as_mut(),
            self.storage.as_mut(),
            &mut self.buffer,
        );
        self.metrics.record_capture(&result);

        match &result {
            Ok(outcome) => {
                if let Some(err) = outcome.commit_error() {
                    self.journal(err);
                }
            }
            Err(err) => self.journal(err),
        }
        Some(result)
    }

    pub fn tick_delivery(&mut self) -> DeliveryOutcome {
        let outcome = self.pump.tick(&mut self.buffer, self.transport.as_mut());
        self.metrics.record_delivery(&outcome);
        outcome
    }

    pub fn tick_uptime(&mut self) -> Result<(), StorageError> {
        if !self.bootstrap.uptime_enabled() {
            return Ok(());
        }
        let result = self.uptime.tick(self.storage.as_mut());
        if let Err(err) = &result {
            self.journal(err);
        }
        let snapshot = self.metrics_snapshot();
        log_info!(
            "uptime {:.1} min, {} pending, counters {:?}, memory {:.1} MB",
            self.uptime.uptime_minutes(),
            snapshot.pending_reports,
            snapshot.counters,
            snapshot.system.memory_mb
        );
        result
    }

    /// Drains waiting inbound messages; returns how many were handled.
    pub fn tick_inbound(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let bytes = match self.transport.poll_inbound() {
                Ok(Some(bytes)) => bytes,
                Ok(None) => break,
                Err(err) => {
                    log_warn!("mesh receive failed: {err}");
                    break;
                }
            };
            match self.registry.decode(&bytes) {
                Ok(message) => {
                    log_message(&message);
                    handled += 1;
                }
                Err(err) => log_warn!("dropping inbound message: {err}"),
            }
        }
        handled
    }

    pub fn metrics_snapshot(&mut self) -> MetricsSnapshot {
        self.metrics.snapshot(self.buffer.len())
    }

    fn journal(&mut self, err: &dyn fmt::Display) {
        let Some(path) = self.error_log.as_deref() else {
            return;
        };
        let line = format!("{} {err}\n", Utc::now().to_rfc3339());
        if let Err(write_err) = self.storage.append(path, &line) {
            log_warn!("failed to append to {path}: {write_err}");
        }
    }
}

pub(crate) fn log_message(message: &MeshMessage) {
    match message {
        MeshMessage::PictureReport(package) => {
            log_info!(
                "node {} has taken the picture {} (score {:.2})",
                package.from,
                package.full_picture_name(),
                package.score
            );
        }
    }
}
