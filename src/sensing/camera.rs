//! Capture peripheral contract and the two bench implementations.

use std::fs;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgb, RgbImage};
use rand::Rng;

use crate::error::CameraError;
use crate::settings::FrameProfile;

/// One encoded picture on loan from the peripheral. Must go back through
/// [`Camera::release`].
#[derive(Debug)]
pub struct Frame {
    pub seq: u64,
    pub bytes: Vec<u8>,
}

impl Frame {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

pub trait Camera {
    fn init(&mut self, profile: FrameProfile) -> Result<(), CameraError>;
    fn capture(&mut self) -> Result<Frame, CameraError>;
    fn release(&mut self, frame: Frame);
    /// Turns off the capture indicator light.
    fn clear_indicator(&mut self);
}

/// Tracks frame buffers on loan and the indicator light.
#[derive(Debug, Default)]
struct FrameLedger {
    profile: Option<FrameProfile>,
    next_seq: u64,
    outstanding: usize,
    indicator: bool,
}

impl FrameLedger {
    fn profile(&self) -> Result<FrameProfile, CameraError> {
        self.profile
            .ok_or_else(|| CameraError::NoFrame("camera not initialized".into()))
    }

    fn lend(&mut self, bytes: Vec<u8>) -> Result<Frame, CameraError> {
        let profile = self.profile()?;
        if self.outstanding >= profile.frame_buffers {
            return Err(CameraError::NoFrame(format!(
                "all {} frame buffers in use",
                profile.frame_buffers
            )));
        }
        if bytes.is_empty() {
            return Err(CameraError::NoFrame("empty frame".into()));
        }
        self.outstanding += 1;
        self.next_seq += 1;
        self.indicator = true;
        Ok(Frame {
            seq: self.next_seq,
            bytes,
        })
    }

    fn give_back(&mut self) {
        self.outstanding = self.outstanding.saturating_sub(1);
    }
}

/// Renders random scenes as JPEG, for benches without a sensor.
#[derive(Debug, Default)]
pub struct SyntheticCamera {
    ledger: FrameLedger,
}

impl SyntheticCamera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outstanding(&self) -> usize {
        self.ledger.outstanding
    }

    pub fn indicator_lit(&self) -> bool {
        self.ledger.indicator
    }

    fn render(profile: FrameProfile) -> Result<Vec<u8>, CameraError> {
        let (width, height) = profile.frame_size.dimensions();
        let mut rng = rand::thread_rng();
        let base: [u8; 3] = rng.gen();
        let mut img = RgbImage::from_fn(width, height, |x, y| {
            let shade = ((x + y) % 64) as u8;
            Rgb([
                base[0].wrapping_add(shade),
                base[1].wrapping_add(shade / 2),
                base[2],
            ])
        });

        // An occasional bright block stands in for something in front of the lens.
        if rng.gen_bool(0.5) {
            let w = rng.gen_range(width / 8..width / 3);
            let h = rng.gen_range(height / 8..height / 3);
            let x0 = rng.gen_range(0..width - w);
            let y0 = rng.gen_range(0..height - h);
            for y in y0..y0 + h {
                for x in x0..x0 + w {
                    img.put_pixel(x, y, Rgb([230, 180, 120]));
                }
            }
        }

        // Sensor quality runs 0..63 with lower meaning better.
        let quality = 100u8.saturating_sub(profile.jpeg_quality).max(1);
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, quality))
            .map_err(|err| CameraError::NoFrame(format!("jpeg encode failed: {err}")))?;
        Ok(bytes)
    }
}

impl Camera for SyntheticCamera {
    fn init(&mut self, profile: FrameProfile) -> Result<(), CameraError> {
        self.ledger.profile = Some(profile);
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame, CameraError> {
        let bytes = Self::render(self.ledger.profile()?)?;
        self.ledger.lend(bytes)
    }

    fn release(&mut self, _frame: Frame) {
        self.ledger.give_back();
    }

    fn clear_indicator(&mut self) {
        self.ledger.indicator = false;
    }
}

/// Plays back `.jpg` files from a directory in name order, wrapping around.
#[derive(Debug)]
pub struct ReplayCamera {
    dir: PathBuf,
    files: Vec<PathBuf>,
    cursor: usize,
    ledger: FrameLedger,
}

impl ReplayCamera {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            files: Vec::new(),
            cursor: 0,
            ledger: FrameLedger::default(),
        }
    }

    pub fn outstanding(&self) -> usize {
        self.ledger.outstanding
    }

    fn scan(dir: &Path) -> Result<Vec<PathBuf>, CameraError> {
        let entries = fs::read_dir(dir)
            .map_err(|err| CameraError::Init(format!("{}: {err}", dir.display())))?;
        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg"))
            })
            .collect();
        files.sort();
        Ok(files)
    }
}

impl Camera for ReplayCamera {
    fn init(&mut self, profile: FrameProfile) -> Result<(), CameraError> {
        let files = Self::scan(&self.dir)?;
        if files.is_empty() {
            return Err(CameraError::Init(format!(
                "no .jpg frames in {}",
                self.dir.display()
            )));
        }
        self.files = files;
        self.cursor = 0;
        self.ledger.profile = Some(profile);
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame, CameraError> {
        self.ledger.profile()?;
        let path = &self.files[self.cursor % self.files.len()];
        self.cursor = (self.cursor + 1) % self.files.len();
        let bytes = fs::read(path)
            .map_err(|err| CameraError::NoFrame(format!("{}: {err}", path.display())))?;
        self.ledger.lend(bytes)
    }

    fn release(&mut self, _frame: Frame) {
        self.ledger.give_back();
    }

    fn clear_indicator(&mut self) {
        self.ledger.indicator = false;
    }
}
