pub mod camera;
pub mod classifier;
pub mod pipeline;

pub use camera::{Camera, Frame, ReplayCamera, SyntheticCamera};
pub use classifier::{classifier_from_settings, Classifier, FixedClassifier, SceneChangeClassifier};
pub use pipeline::{CaptureOutcome, CapturePipeline, CaptureStage};
