// src/types.rs

use serde::{Deserialize, Serialize};

/// Class names of the deployed waste classifier, in model output order.
pub const CLASS_NAMES: [&str; 10] = [
    "battery",
    "biological",
    "cardboard",
    "clothes",
    "glass",
    "metal",
    "paper",
    "plastic",
    "shoes",
    "trash",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub smoothing: SmoothingConfig,
    #[serde(default)]
    pub fusion: FusionConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmoothingConfig {
    /// Voting window per track (N). Larger is smoother but laggier.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    /// Frames a track may go unseen before its history is evicted.
    #[serde(default = "default_staleness_window")]
    pub staleness_window: u64,
    /// Frames between inline eviction sweeps.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionConfig {
    /// Classification confidence gate. Below this the observation
    /// degrades to Unknown so low-confidence noise cannot win votes.
    #[serde(default = "default_conf_cls")]
    pub conf_cls: f32,
    /// Pixels added on every side of a detection box before cropping.
    #[serde(default = "default_region_padding")]
    pub region_padding_px: u32,
    /// Regions smaller than this (either dimension, after clamping)
    /// are dropped as noise.
    #[serde(default = "default_min_region_size")]
    pub min_region_size: u32,
    /// Square side of the classifier input.
    #[serde(default = "default_input_size")]
    pub input_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Detector confidence floor, applied by the external detector.
    #[serde(default = "default_conf_det")]
    pub conf_det: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_history_window() -> usize {
    10
}
fn default_staleness_window() -> u64 {
    90
}
fn default_sweep_interval() -> u64 {
    30
}
fn default_conf_cls() -> f32 {
    0.5
}
fn default_region_padding() -> u32 {
    10
}
fn default_min_region_size() -> u32 {
    20
}
fn default_input_size() -> usize {
    224
}
fn default_conf_det() -> f32 {
    0.3
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            staleness_window: default_staleness_window(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            conf_cls: default_conf_cls(),
            region_padding_px: default_region_padding(),
            min_region_size: default_min_region_size(),
            input_size: default_input_size(),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            conf_det: default_conf_det(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            smoothing: SmoothingConfig::default(),
            fusion: FusionConfig::default(),
            detection: DetectionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// One raw RGB camera frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub timestamp_ms: f64,
}

/// One tracked detection from the external detector/tracker.
/// `bbox` is [x1, y1, x2, y2] in frame pixels.
#[derive(Debug, Clone)]
pub struct Detection {
    pub track_id: u32,
    pub bbox: [f32; 4],
    pub confidence: f32,
}

/// Track identity namespaced by stream, so several camera pipelines
/// can share one history store without id collisions.
///
/// The external tracker may recycle a track id after an object leaves
/// the scene; the smoothing core cannot distinguish reuse from
/// continuity. Accepted approximation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackKey {
    pub stream: u32,
    pub track: u32,
}

impl TrackKey {
    pub fn new(stream: u32, track: u32) -> Self {
        Self { stream, track }
    }
}

impl std::fmt::Display for TrackKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.stream, self.track)
    }
}

/// A per-frame classification result. Unknown is a valid vote outcome,
/// not an error: it is produced when the classifier fails or its
/// confidence falls below the configured gate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Label {
    Class(String),
    Unknown,
}

impl Label {
    pub fn class(name: &str) -> Self {
        Self::Class(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Class(name) => name.as_str(),
            Self::Unknown => "unknown",
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classification result for one tracked object in one frame.
#[derive(Debug, Clone)]
pub struct RawObservation {
    pub key: TrackKey,
    pub bbox: [f32; 4],
    pub label: Label,
    pub confidence: f32,
    pub frame_seq: u64,
}
