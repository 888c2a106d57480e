use std::time::Instant;

use crate::buffer::ReportBuffer;
use crate::error::NodeError;
use crate::models::{picture_name, PictureReport, Score};
use crate::sequence::SequenceStore;
use crate::storage::BlockStorage;

use super::camera::{Camera, Frame};
use super::classifier::Classifier;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

pub const PICTURES_DIR: &str = "/pictures";
pub const REPORTS_DIR: &str = "/reports";
pub const DROPPED_REPORTS_PATH: &str = "/reports/dropped.jsonl";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStage {
    Idle,
    Capturing,
    Persisting,
    Classifying,
    Discarding,
    Enqueueing,
}

/// How a cycle that got past persistence ended.
#[derive(Debug)]
pub enum CaptureOutcome {
    /// Picture kept on storage, score below the gate, nothing queued.
    Discarded {
        index: u32,
        score: Score,
        commit_error: Option<NodeError>,
    },
    Enqueued {
        report: PictureReport,
        evicted: Option<PictureReport>,
        commit_error: Option<NodeError>,
    },
}

impl CaptureOutcome {
    pub fn commit_error(&self) -> Option<&NodeError> {
        match self {
            CaptureOutcome::Discarded { commit_error, .. }
            | CaptureOutcome::Enqueued { commit_error, .. } => commit_error.as_ref(),
        }
    }
}

/// Capture, persist, classify and queue one picture per cycle.
pub struct CapturePipeline {
    origin: u32,
    threshold: f32,
    sequence: SequenceStore,
    stage: CaptureStage,
}

impl CapturePipeline {
    pub fn new(origin: u32, threshold: f32, sequence: SequenceStore) -> Self {
        Self {
            origin,
            threshold,
            sequence,
            stage: CaptureStage::Idle,
        }
    }

    pub fn origin(&self) -> u32 {
        self.origin
    }

    pub fn stage(&self) -> CaptureStage {
        self.stage
    }

    pub fn sequence(&self) -> &SequenceStore {
        &self.sequence
    }

    pub fn sequence_mut(&mut self) -> &mut SequenceStore {
        &mut self.sequence
    }

    pub fn picture_path(&self, index: u32) -> String {
        format!("{PICTURES_DIR}/{}", picture_name(self.origin, index))
    }

    /// Runs one cycle. `Err` means the cycle was aborted before anything was
    /// queued; the frame, if one was taken, has been released either way.
    pub fn run_cycle(
        &mut self,
        camera: &mut dyn Camera,
        classifier: &mut dyn Classifier,
        storage: &mut dyn BlockStorage,
        buffer: &mut ReportBuffer,
    ) -> Result<CaptureOutcome, NodeError> {
        let cycle_start = Instant::now();
        self.enter(CaptureStage::Capturing);

        let frame = match camera.capture() {
            Ok(frame) => frame,
            Err(err) => {
                log_error!("camera capture failed: {err}");
                self.enter(CaptureStage::Idle);
                return Err(NodeError::CaptureFailed(err));
            }
        };

        let result = self.process(&frame, classifier, storage, buffer);
        camera.release(frame);
        if matches!(result, Ok(CaptureOutcome::Enqueued { .. })) {
            camera.clear_indicator();
        }
        self.enter(CaptureStage::Idle);

        log_debug!("capture cycle finished in {}ms", cycle_start.elapsed().as_millis());
        result
    }

    fn process(
        &mut self,
        frame: &Frame,
        classifier: &mut dyn Classifier,
        storage: &mut dyn BlockStorage,
        buffer: &mut ReportBuffer,
    ) -> Result<CaptureOutcome, NodeError> {
        let index = self.sequence.next();
        let path = self.picture_path(index);

        self.enter(CaptureStage::Persisting);
        if let Err(source) = storage.write(&path, &frame.bytes) {
            log_error!("failed to save picture {path} ({} bytes): {source}", frame.len());
            return Err(NodeError::WriteFailed { path, source });
        }
        log_info!("saved picture to {path} ({} bytes)", frame.len());

        let commit_error = match self.sequence.commit(index) {
            Ok(()) => None,
            Err(source) => {
                log_error!("picture index {index} not committed, it will be reused: {source}");
                Some(NodeError::CommitFailed { index, source })
            }
        };

        self.enter(CaptureStage::Classifying);
        let score = classifier.classify(frame);
        let report = PictureReport::new(self.origin, index, score);

        if !score.passes(self.threshold) {
            self.enter(CaptureStage::Discarding);
            log_info!(
                "score {score} on \"{}\" below {:.2}, no report queued",
                report.display_name(),
                self.threshold
            );
            return Ok(CaptureOutcome::Discarded {
                index,
                score,
                commit_error,
            });
        }

        self.enter(CaptureStage::Enqueueing);
        let evicted = buffer.push(report);
        if let Some(dropped) = &evicted {
            log_info!(
                "report queue full, dropped oldest report \"{}\"",
                dropped.display_name()
            );
            archive_dropped(storage, dropped);
        }
        log_info!(
            "queued report \"{}\" (score {score}, {} pending)",
            report.display_name(),
            buffer.len()
        );

        Ok(CaptureOutcome::Enqueued {
            report,
            evicted,
            commit_error,
        })
    }

    fn enter(&mut self, stage: CaptureStage) {
        log_debug!("capture stage {:?} -> {stage:?}", self.stage);
        self.stage = stage;
    }
}

/// Keeps a line per evicted report so the loss can be reconciled later.
fn archive_dropped(storage: &mut dyn BlockStorage, report: &PictureReport) {
    let line = match serde_json::to_string(report) {
        Ok(json) => json + "\n",
        Err(err) => {
            log_warn!("could not serialize dropped report: {err}");
            return;
        }
    };
    if let Err(err) = storage.append(DROPPED_REPORTS_PATH, &line) {
        log_warn!(
            "could not archive dropped report \"{}\": {err}",
            report.display_name()
        );
    }
}
