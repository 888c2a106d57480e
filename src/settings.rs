use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FrameSize {
    Qvga,
    Vga,
    Svga,
    Xga,
    Uxga,
}

impl FrameSize {
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            FrameSize::Qvga => (320, 240),
            FrameSize::Vga => (640, 480),
            FrameSize::Svga => (800, 600),
            FrameSize::Xga => (1024, 768),
            FrameSize::Uxga => (1600, 1200),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum CameraSource {
    Synthetic,
    Replay { dir: PathBuf },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub source: CameraSource,
    /// External frame memory present; selects the large frame profile.
    pub psram: bool,
    /// Overrides the profile's frame size when set.
    pub frame_size: Option<FrameSize>,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            source: CameraSource::Synthetic,
            psram: false,
            frame_size: None,
        }
    }
}

/// Frame geometry and encoding chosen at peripheral init.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameProfile {
    pub frame_size: FrameSize,
    pub jpeg_quality: u8,
    pub frame_buffers: usize,
}

impl CameraSettings {
    pub fn profile(&self) -> FrameProfile {
        let mut profile = if self.psram {
            FrameProfile {
                frame_size: FrameSize::Uxga,
                jpeg_quality: 10,
                frame_buffers: 2,
            }
        } else {
            FrameProfile {
                frame_size: FrameSize::Svga,
                jpeg_quality: 12,
                frame_buffers: 1,
            }
        };
        if let Some(size) = self.frame_size {
            profile.frame_size = size;
        }
        profile
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ClassifierSettings {
    Fixed { score: f32 },
    SceneChange,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        // Placeholder model output used until a real detector ships.
        ClassifierSettings::Fixed { score: 0.5 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSettings {
    pub node_id: u32,
    pub destination_id: u32,
    pub collector_addr: String,
    pub bind_addr: String,
    pub storage_root: PathBuf,
    pub sequence_cell_path: PathBuf,
    pub capture_period_secs: u64,
    pub delivery_period_secs: u64,
    pub uptime_period_secs: u64,
    pub bootstrap_window_secs: u64,
    pub buffer_capacity: usize,
    pub score_threshold: f32,
    pub camera: CameraSettings,
    pub classifier: ClassifierSettings,
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            node_id: 1,
            destination_id: 3_177_562_153,
            collector_addr: "127.0.0.1:5555".into(),
            bind_addr: "0.0.0.0:0".into(),
            storage_root: PathBuf::from("./sdcard"),
            sequence_cell_path: PathBuf::from("./sdcard.eeprom"),
            capture_period_secs: 120,
            delivery_period_secs: 60,
            uptime_period_secs: 15 * 60,
            bootstrap_window_secs: 30,
            buffer_capacity: 10,
            score_threshold: 0.5,
            camera: CameraSettings::default(),
            classifier: ClassifierSettings::default(),
        }
    }
}

impl NodeSettings {
    pub fn capture_period(&self) -> Duration {
        Duration::from_secs(self.capture_period_secs.max(1))
    }

    pub fn delivery_period(&self) -> Duration {
        Duration::from_secs(self.delivery_period_secs.max(1))
    }

    pub fn uptime_period(&self) -> Duration {
        Duration::from_secs(self.uptime_period_secs.max(1))
    }

    pub fn bootstrap_window(&self) -> Duration {
        Duration::from_secs(self.bootstrap_window_secs.max(1))
    }

    /// Bench profile: every period shrinks to a few seconds.
    pub fn with_debug_periods(mut self) -> Self {
        self.capture_period_secs = 10;
        self.delivery_period_secs = 5;
        self.uptime_period_secs = 15;
        self.bootstrap_window_secs = 1;
        self
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: NodeSettings,
}

impl SettingsStore {
    /// Loads settings from `path`. A missing file yields defaults and writes
    /// them out as a template.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse settings in {}", path.display()))?
        } else {
            let store = Self {
                path,
                data: NodeSettings::default(),
            };
            store.persist()?;
            return Ok(store);
        };

        Ok(Self { path, data })
    }

    pub fn node(&self) -> &NodeSettings {
        &self.data
    }

    pub fn into_node(self) -> NodeSettings {
        self.data
    }

    fn persist(&self) -> Result<()> {
        let serialized = serde_json::to_string_pretty(&self.data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
