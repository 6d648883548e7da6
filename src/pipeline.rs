// src/pipeline.rs
//
// Per-stream orchestration of the smoothing engine.
//
// One pipeline instance owns one camera stream and processes its frames
// strictly in sequence order, so history appends for a given track match
// temporal order. Several pipelines (one per camera) may share one
// TrackHistoryStore; their track keys are namespaced by stream id.

use crate::display;
use crate::fusion::{Classifier, FrameFusion};
use crate::history::TrackHistoryStore;
use crate::types::{Config, Detection, Frame, Label, TrackKey};
use crate::vote::{ResolvedVote, VoteResolver};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, warn};

/// External detector/tracker boundary. Per frame it yields tracked
/// detections with temporally-consistent ids, to the extent its own
/// algorithm allows.
pub trait Detector {
    fn detect_and_track(&mut self, frame: &Frame) -> Result<Vec<Detection>>;
}

/// One display-ready smoothed result for one tracked object.
#[derive(Debug, Clone)]
pub struct TrackedLabel {
    pub key: TrackKey,
    pub bbox: [f32; 4],
    pub vote: ResolvedVote,
    pub color: display::Rgb,
    pub text: String,
}

/// Single-shot classification of a whole frame, bypassing tracking.
/// Used by the still-image analysis path; does not touch any history.
#[derive(Debug, Clone)]
pub struct FrameClassification {
    pub label: Label,
    pub confidence: f32,
    pub band: display::ConfidenceBand,
}

pub struct Pipeline<D: Detector, C: Classifier> {
    stream: u32,
    detector: D,
    classifier: C,
    fusion: FrameFusion,
    store: Arc<TrackHistoryStore>,
    resolver: VoteResolver,
    frame_seq: u64,
    staleness_window: u64,
    sweep_interval: u64,
    input_size: usize,
}

impl<D: Detector, C: Classifier> Pipeline<D, C> {
    pub fn new(
        config: &Config,
        stream: u32,
        detector: D,
        classifier: C,
        store: Arc<TrackHistoryStore>,
    ) -> Self {
        Self {
            stream,
            detector,
            classifier,
            fusion: FrameFusion::new(config.fusion.clone()),
            resolver: VoteResolver::new(store.window()),
            store,
            frame_seq: 0,
            staleness_window: config.smoothing.staleness_window,
            sweep_interval: config.smoothing.sweep_interval.max(1),
            input_size: config.fusion.input_size,
        }
    }

    pub fn frame_seq(&self) -> u64 {
        self.frame_seq
    }

    /// Process one frame: detect, fuse, append observations, resolve
    /// votes, and run the eviction sweep on its cadence.
    ///
    /// A detector failure yields an empty result for this frame and
    /// leaves all histories untouched (the sweep still runs, so silent
    /// tracks keep aging out).
    pub fn process_frame(&mut self, frame: &Frame) -> Vec<TrackedLabel> {
        self.frame_seq += 1;

        let detections = match self.detector.detect_and_track(frame) {
            Ok(detections) => detections,
            Err(e) => {
                warn!("Frame {}: detector failed: {}", self.frame_seq, e);
                Vec::new()
            }
        };

        let observations =
            self.fusion
                .fuse(&self.classifier, frame, &detections, self.stream, self.frame_seq);

        let mut resolved = Vec::with_capacity(observations.len());
        for obs in observations {
            self.store.update(obs.key, obs.label, obs.frame_seq);

            let Some(history) = self.store.snapshot(obs.key) else {
                // Evicted between update and snapshot; can only happen
                // if a concurrent sweep raced an already-stale entry.
                debug!("Track {} vanished before resolution", obs.key);
                continue;
            };
            let Some(vote) = self.resolver.resolve(&history) else {
                continue;
            };

            resolved.push(TrackedLabel {
                key: obs.key,
                bbox: obs.bbox,
                color: display::tier_color(vote.tier),
                text: display::label_text(obs.key, &vote),
                vote,
            });
        }

        if self.frame_seq % self.sweep_interval == 0 {
            self.store.sweep(self.frame_seq, self.staleness_window);
        }

        resolved
    }

    /// Classify the whole frame in one shot, without tracking.
    pub fn classify_frame(&self, frame: &Frame) -> Result<FrameClassification> {
        let input =
            crate::preprocessing::letterbox(&frame.data, frame.width, frame.height, self.input_size)?;
        let (label, confidence) =
            self.classifier
                .classify(&input, self.input_size, self.input_size)?;
        Ok(FrameClassification {
            label,
            confidence,
            band: display::ConfidenceBand::from_confidence(confidence),
        })
    }

    /// Release every history entry belonging to this stream. Called
    /// when the stream ends so shutdown never leaks per-track state.
    pub fn shutdown(self) -> usize {
        self.store.remove_stream(self.stream)
    }
}
