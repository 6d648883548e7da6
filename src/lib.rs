// src/lib.rs
//
// Temporal identity-tracked label smoothing for live-camera waste
// classification. The detector/tracker and classifier are external
// collaborators behind the `Detector` and `Classifier` traits; this
// crate owns the fusion, voting and per-track lifecycle in between.

pub mod config;
pub mod display;
pub mod fusion;
pub mod history;
pub mod pipeline;
pub mod preprocessing;
pub mod types;
pub mod vote;

// Re-export public APIs
pub use fusion::{Classifier, FrameFusion};
pub use history::TrackHistoryStore;
pub use pipeline::{Detector, FrameClassification, Pipeline, TrackedLabel};
pub use types::{Config, Detection, Frame, Label, RawObservation, TrackKey, CLASS_NAMES};
pub use vote::{ResolvedVote, Tier, VoteResolver};
