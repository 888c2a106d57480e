#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use fieldcam_lib::error::{CameraError, CellError, StorageError, TransportError};
use fieldcam_lib::mesh::Transport;
use fieldcam_lib::models::Score;
use fieldcam_lib::sensing::{Camera, Classifier, Frame};
use fieldcam_lib::settings::FrameProfile;
use fieldcam_lib::storage::{BlockStorage, SequenceCell};

#[derive(Default)]
pub struct FakeCamera {
    pub init_failures: usize,
    pub fail_next: usize,
    pub initialized: bool,
    pub outstanding: usize,
    pub captured: u64,
    pub indicator: bool,
}

impl Camera for FakeCamera {
    fn init(&mut self, _profile: FrameProfile) -> Result<(), CameraError> {
        if self.init_failures > 0 {
            self.init_failures -= 1;
            return Err(CameraError::Init("sensor not responding".into()));
        }
        self.initialized = true;
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame, CameraError> {
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(CameraError::NoFrame("sensor timeout".into()));
        }
        self.captured += 1;
        self.outstanding += 1;
        self.indicator = true;
        Ok(Frame {
            seq: self.captured,
            bytes: vec![0xff, 0xd8, self.captured as u8, 0xff, 0xd9],
        })
    }

    fn release(&mut self, _frame: Frame) {
        self.outstanding -= 1;
    }

    fn clear_indicator(&mut self) {
        self.indicator = false;
    }
}

/// Returns queued scores in order, then repeats the last one.
pub struct ScriptedClassifier {
    scores: VecDeque<f32>,
    last: f32,
}

impl ScriptedClassifier {
    pub fn new(scores: &[f32]) -> Self {
        Self {
            scores: scores.iter().copied().collect(),
            last: scores.last().copied().unwrap_or(0.0),
        }
    }
}

impl Classifier for ScriptedClassifier {
    fn classify(&mut self, _frame: &Frame) -> Score {
        Score::new(self.scores.pop_front().unwrap_or(self.last))
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    pub files: HashMap<String, Vec<u8>>,
    pub dirs: HashSet<String>,
    pub mounted: bool,
    pub no_card: bool,
    pub fail_writes: bool,
    pub fail_mkdir: bool,
}

impl MemoryStorage {
    pub fn text(&self, path: &str) -> String {
        String::from_utf8(self.files.get(path).cloned().unwrap_or_default()).unwrap()
    }

    fn io(op: &'static str, path: &str) -> StorageError {
        StorageError::io(op, path, std::io::Error::other("card rejected"))
    }
}

impl BlockStorage for MemoryStorage {
    fn mount(&mut self) -> Result<(), StorageError> {
        if self.no_card {
            return Err(StorageError::NoCard("slot0".into()));
        }
        self.mounted = true;
        Ok(())
    }

    fn write(&mut self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(Self::io("write", path));
        }
        self.files.insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        self.files.contains_key(path) || self.dirs.contains(path)
    }

    fn mkdir(&mut self, path: &str) -> Result<(), StorageError> {
        if self.fail_mkdir {
            return Err(Self::io("mkdir", path));
        }
        self.dirs.insert(path.to_string());
        Ok(())
    }

    fn append(&mut self, path: &str, text: &str) -> Result<(), StorageError> {
        self.files
            .entry(path.to_string())
            .or_default()
            .extend_from_slice(text.as_bytes());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryCell {
    pub bytes: Vec<u8>,
    pub fail_writes: bool,
}

impl MemoryCell {
    pub fn holding(value: u8) -> Self {
        Self {
            bytes: vec![value],
            fail_writes: false,
        }
    }
}

impl SequenceCell for MemoryCell {
    fn begin(&mut self, size: usize) -> Result<(), CellError> {
        self.bytes.resize(size, 0);
        Ok(())
    }

    fn read_byte(&self, slot: usize) -> u8 {
        self.bytes.get(slot).copied().unwrap_or(0)
    }

    fn write_byte(&mut self, slot: usize, value: u8) -> Result<(), CellError> {
        if self.fail_writes {
            return Err(CellError::Io(std::io::Error::other("cell busy")));
        }
        self.bytes[slot] = value;
        Ok(())
    }
}

/// Transport whose outcomes are scripted; every attempt is recorded.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    pub outcomes: Rc<RefCell<VecDeque<bool>>>,
    pub attempts: Rc<RefCell<Vec<serde_json::Value>>>,
}

impl ScriptedTransport {
    pub fn script(&self, outcomes: &[bool]) {
        self.outcomes.borrow_mut().extend(outcomes.iter().copied());
    }

    pub fn attempted_indices(&self) -> Vec<u64> {
        self.attempts
            .borrow()
            .iter()
            .map(|value| value["pictureIndex"].as_u64().unwrap())
            .collect()
    }
}

impl Transport for ScriptedTransport {
    fn send(&mut self, destination: u32, payload: &[u8]) -> Result<(), TransportError> {
        self.attempts
            .borrow_mut()
            .push(serde_json::from_slice(payload).unwrap());
        if self.outcomes.borrow_mut().pop_front().unwrap_or(true) {
            Ok(())
        } else {
            Err(TransportError::NoRoute(destination))
        }
    }
}
