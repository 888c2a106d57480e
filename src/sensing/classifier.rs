use image::ImageFormat;
use image_hasher::{HashAlg, HasherConfig, ImageHash};

use crate::models::Score;
use crate::settings::ClassifierSettings;

use super::camera::Frame;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_warn;

const HASH_SIZE: u32 = 8;

pub trait Classifier {
    fn classify(&mut self, frame: &Frame) -> Score;
}

pub fn classifier_from_settings(settings: &ClassifierSettings) -> Box<dyn Classifier> {
    match settings {
        ClassifierSettings::Fixed { score } => Box::new(FixedClassifier::new(Score::new(*score))),
        ClassifierSettings::SceneChange => Box::new(SceneChangeClassifier::new()),
    }
}

/// Returns the same score for every frame.
#[derive(Debug, Clone, Copy)]
pub struct FixedClassifier {
    score: Score,
}

impl FixedClassifier {
    pub fn new(score: Score) -> Self {
        Self { score }
    }
}

impl Classifier for FixedClassifier {
    fn classify(&mut self, _frame: &Frame) -> Score {
        self.score
    }
}

/// Scores how far a frame's perceptual hash moved from the previous frame.
///
/// A static scene scores near zero; something entering the view pushes the
/// normalized Hamming distance up. The first frame only sets the baseline.
#[derive(Default)]
pub struct SceneChangeClassifier {
    last_hash: Option<ImageHash>,
}

impl SceneChangeClassifier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Classifier for SceneChangeClassifier {
    fn classify(&mut self, frame: &Frame) -> Score {
        let hash = match compute_phash(&frame.bytes) {
            Ok(hash) => hash,
            Err(err) => {
                log_warn!("frame {} could not be decoded for scoring: {err}", frame.seq);
                return Score::ZERO;
            }
        };

        let score = match &self.last_hash {
            Some(previous) => change_score(&hash, previous),
            None => Score::ZERO,
        };
        self.last_hash = Some(hash);
        score
    }
}

pub fn compute_phash(jpeg_bytes: &[u8]) -> image::ImageResult<ImageHash> {
    let img = image::load_from_memory_with_format(jpeg_bytes, ImageFormat::Jpeg)?;
    let hasher = HasherConfig::new()
        .hash_alg(HashAlg::DoubleGradient)
        .hash_size(HASH_SIZE, HASH_SIZE)
        .to_hasher();

    Ok(hasher.hash_image(&img))
}

fn change_score(current: &ImageHash, previous: &ImageHash) -> Score {
    let bits = current.as_bytes().len() * 8;
    if bits == 0 {
        return Score::ZERO;
    }
    // Half the bits flipping already means an unrelated picture.
    let distance = current.dist(previous) as f32;
    Score::new(2.0 * distance / bits as f32)
}
