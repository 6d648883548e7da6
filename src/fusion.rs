// src/fusion.rs
//
// Per-frame fusion of detector output and classifier output into raw
// per-track observations. Stateless: history lives in the store, and
// every failure here degrades a single observation instead of the frame.

use crate::preprocessing;
use crate::types::{Detection, Frame, FusionConfig, Label, RawObservation, TrackKey};
use anyhow::Result;
use tracing::debug;

/// External classifier boundary. Given a fixed-size RGB image it
/// returns a label from the known class set plus a confidence in [0,1].
pub trait Classifier {
    fn classify(&self, rgb: &[u8], width: usize, height: usize) -> Result<(Label, f32)>;
}

pub struct FrameFusion {
    config: FusionConfig,
}

impl FrameFusion {
    pub fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    /// Produce one observation per surviving detection.
    ///
    /// Detections whose padded, frame-clamped region is smaller than
    /// the minimum size are dropped silently as noise. A classifier
    /// failure or a confidence below the gate yields an Unknown
    /// observation; neither stops the frame.
    pub fn fuse(
        &self,
        classifier: &dyn Classifier,
        frame: &Frame,
        detections: &[Detection],
        stream: u32,
        frame_seq: u64,
    ) -> Vec<RawObservation> {
        let mut observations = Vec::with_capacity(detections.len());

        for det in detections {
            let Some((x1, y1, x2, y2)) = self.padded_region(det.bbox, frame.width, frame.height)
            else {
                debug!(
                    "Frame {}: dropped region {:?} below {}px minimum",
                    frame_seq, det.bbox, self.config.min_region_size
                );
                continue;
            };

            let (label, confidence) = match self.classify_region(
                classifier,
                frame,
                x1,
                y1,
                x2,
                y2,
            ) {
                Ok((label, conf)) => (label, conf),
                Err(e) => {
                    debug!(
                        "Frame {}: classification failed for track {}: {}",
                        frame_seq, det.track_id, e
                    );
                    (Label::Unknown, 0.0)
                }
            };

            // Confidence gate: a low-score prediction must not vote
            let label = if confidence < self.config.conf_cls {
                Label::Unknown
            } else {
                label
            };

            observations.push(RawObservation {
                key: TrackKey::new(stream, det.track_id),
                bbox: det.bbox,
                label,
                confidence,
                frame_seq,
            });
        }

        observations
    }

    /// Expand a detection box by the configured padding, clamped to the
    /// frame. Returns None when the clamped region is below the minimum
    /// size in either dimension.
    fn padded_region(
        &self,
        bbox: [f32; 4],
        frame_w: usize,
        frame_h: usize,
    ) -> Option<(usize, usize, usize, usize)> {
        let pad = self.config.region_padding_px as i64;

        let x1 = (bbox[0] as i64 - pad).max(0) as usize;
        let y1 = (bbox[1] as i64 - pad).max(0) as usize;
        let x2 = ((bbox[2] as i64 + pad).max(0) as usize).min(frame_w);
        let y2 = ((bbox[3] as i64 + pad).max(0) as usize).min(frame_h);

        if x2 <= x1 || y2 <= y1 {
            return None;
        }

        let min = self.config.min_region_size as usize;
        if x2 - x1 < min || y2 - y1 < min {
            return None;
        }

        Some((x1, y1, x2, y2))
    }

    fn classify_region(
        &self,
        classifier: &dyn Classifier,
        frame: &Frame,
        x1: usize,
        y1: usize,
        x2: usize,
        y2: usize,
    ) -> Result<(Label, f32)> {
        let crop = preprocessing::crop_region(&frame.data, frame.width, frame.height, x1, y1, x2, y2)?;
        let input = preprocessing::letterbox(&crop, x2 - x1, y2 - y1, self.config.input_size)?;
        classifier.classify(&input, self.config.input_size, self.config.input_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Classifier stub returning a fixed answer.
    struct FixedClassifier {
        label: Label,
        confidence: f32,
    }

    impl Classifier for FixedClassifier {
        fn classify(&self, _rgb: &[u8], _w: usize, _h: usize) -> Result<(Label, f32)> {
            Ok((self.label.clone(), self.confidence))
        }
    }

    struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn classify(&self, _rgb: &[u8], _w: usize, _h: usize) -> Result<(Label, f32)> {
            anyhow::bail!("inference timeout")
        }
    }

    fn frame(width: usize, height: usize) -> Frame {
        Frame {
            data: vec![128u8; width * height * 3],
            width,
            height,
            timestamp_ms: 0.0,
        }
    }

    fn detection(track_id: u32, bbox: [f32; 4]) -> Detection {
        Detection {
            track_id,
            bbox,
            confidence: 0.9,
        }
    }

    #[test]
    fn test_confident_prediction_keeps_its_label() {
        let fusion = FrameFusion::new(FusionConfig::default());
        let classifier = FixedClassifier {
            label: Label::class("plastic"),
            confidence: 0.8,
        };

        let obs = fusion.fuse(
            &classifier,
            &frame(640, 480),
            &[detection(1, [100.0, 100.0, 200.0, 200.0])],
            0,
            1,
        );

        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].label, Label::class("plastic"));
        assert_eq!(obs[0].key, TrackKey::new(0, 1));
        assert_eq!(obs[0].frame_seq, 1);
    }

    #[test]
    fn test_low_confidence_is_gated_to_unknown() {
        // conf 0.2 under the default 0.5 gate
        let fusion = FrameFusion::new(FusionConfig::default());
        let classifier = FixedClassifier {
            label: Label::class("glass"),
            confidence: 0.2,
        };

        let obs = fusion.fuse(
            &classifier,
            &frame(640, 480),
            &[detection(1, [100.0, 100.0, 200.0, 200.0])],
            0,
            1,
        );

        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].label, Label::Unknown);
        assert!((obs[0].confidence - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn test_small_region_clamped_at_edge_is_dropped() {
        // A 15x15 box in the corner of an 18px-wide frame.
        // Padding would expand it to 35x35 but the frame edge clamps it
        // back to 18 wide, under the 20px minimum.
        let fusion = FrameFusion::new(FusionConfig::default());
        let classifier = FixedClassifier {
            label: Label::class("metal"),
            confidence: 0.9,
        };

        let obs = fusion.fuse(
            &classifier,
            &frame(18, 480),
            &[detection(1, [0.0, 100.0, 15.0, 115.0])],
            0,
            1,
        );

        assert!(obs.is_empty());
    }

    #[test]
    fn test_small_region_away_from_edge_survives_via_padding() {
        // The same 15x15 box mid-frame grows to 35x35 after padding
        let fusion = FrameFusion::new(FusionConfig::default());
        let classifier = FixedClassifier {
            label: Label::class("metal"),
            confidence: 0.9,
        };

        let obs = fusion.fuse(
            &classifier,
            &frame(640, 480),
            &[detection(1, [300.0, 200.0, 315.0, 215.0])],
            0,
            1,
        );

        assert_eq!(obs.len(), 1);
    }

    #[test]
    fn test_zero_area_detection_is_dropped_silently() {
        let fusion = FrameFusion::new(FusionConfig {
            region_padding_px: 0,
            ..FusionConfig::default()
        });
        let classifier = FixedClassifier {
            label: Label::class("metal"),
            confidence: 0.9,
        };

        let obs = fusion.fuse(
            &classifier,
            &frame(640, 480),
            &[detection(1, [100.0, 100.0, 100.0, 100.0])],
            0,
            1,
        );

        assert!(obs.is_empty());
    }

    #[test]
    fn test_classifier_failure_degrades_to_unknown() {
        let fusion = FrameFusion::new(FusionConfig::default());

        let obs = fusion.fuse(
            &FailingClassifier,
            &frame(640, 480),
            &[
                detection(1, [100.0, 100.0, 200.0, 200.0]),
                detection(2, [300.0, 100.0, 400.0, 200.0]),
            ],
            0,
            7,
        );

        assert_eq!(obs.len(), 2);
        assert!(obs.iter().all(|o| o.label == Label::Unknown));
    }

    #[test]
    fn test_one_observation_per_surviving_detection() {
        let fusion = FrameFusion::new(FusionConfig::default());
        let classifier = FixedClassifier {
            label: Label::class("cardboard"),
            confidence: 0.7,
        };

        let detections = vec![
            detection(1, [50.0, 50.0, 150.0, 150.0]),
            detection(2, [2.0, 2.0, 6.0, 6.0]), // clamps to 16px after padding, dropped
            detection(3, [200.0, 200.0, 320.0, 320.0]),
        ];

        let obs = fusion.fuse(&classifier, &frame(640, 480), &detections, 3, 12);
        assert_eq!(obs.len(), 2);
        assert_eq!(obs[0].key, TrackKey::new(3, 1));
        assert_eq!(obs[1].key, TrackKey::new(3, 3));
    }
}
