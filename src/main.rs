// src/main.rs
//
// Demo: runs the smoothing pipeline against a simulated camera scene.
// Objects enter, drift across the frame and leave; each is painted a
// class-specific color so the stub classifier can "recognize" it from
// the actual letterboxed pixels, with injected noise and low-confidence
// misreads. Stable-label transitions are written to a JSONL log and an
// annotated snapshot of the final frame is saved as JPEG.

use anyhow::Result;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use tracing::{info, warn};
use waste_detection::{
    display, Classifier, Config, Detection, Detector, Frame, Label, Pipeline, Tier,
    TrackHistoryStore, TrackKey, CLASS_NAMES,
};

const FRAME_WIDTH: usize = 640;
const FRAME_HEIGHT: usize = 480;
const TOTAL_FRAMES: u64 = 280;

/// One simulated object moving through the scene.
struct SceneObject {
    track_id: u32,
    class_idx: usize,
    enter_frame: u64,
    exit_frame: u64,
    start: (f32, f32),
    velocity: (f32, f32),
    size: (f32, f32),
    /// Pixels of growth per frame, for objects approaching the camera
    growth: f32,
}

impl SceneObject {
    fn bbox_at(&self, frame_seq: u64) -> Option<[f32; 4]> {
        if frame_seq < self.enter_frame || frame_seq > self.exit_frame {
            return None;
        }
        let age = (frame_seq - self.enter_frame) as f32;
        let x = self.start.0 + self.velocity.0 * age;
        let y = self.start.1 + self.velocity.1 * age;
        let w = self.size.0 + self.growth * age;
        let h = self.size.1 + self.growth * age;
        Some([x, y, x + w, y + h])
    }

    /// Red-channel fill encoding the class, so the classifier stub can
    /// read it back out of the crop.
    fn fill_red(&self) -> u8 {
        (self.class_idx as u8) * 20 + 5
    }
}

/// Detector stub: paints nothing, just reports tracked boxes for the
/// objects currently in the scene.
struct SimulatedTracker {
    objects: Vec<SceneObject>,
    frame_seq: u64,
}

impl Detector for SimulatedTracker {
    fn detect_and_track(&mut self, _frame: &Frame) -> Result<Vec<Detection>> {
        self.frame_seq += 1;
        let seq = self.frame_seq;
        Ok(self
            .objects
            .iter()
            .filter_map(|obj| {
                obj.bbox_at(seq).map(|bbox| Detection {
                    track_id: obj.track_id,
                    bbox,
                    confidence: 0.85,
                })
            })
            .collect())
    }
}

/// Classifier stub: reads the class color from the center of the
/// letterboxed input and perturbs the answer with seeded noise.
struct NoisyClassifier {
    rng: RefCell<rand::rngs::StdRng>,
}

impl Classifier for NoisyClassifier {
    fn classify(&self, rgb: &[u8], width: usize, height: usize) -> Result<(Label, f32)> {
        let center = ((height / 2) * width + width / 2) * 3;
        let red = rgb[center];
        let class_idx = ((red / 20) as usize).min(CLASS_NAMES.len() - 1);

        let mut rng = self.rng.borrow_mut();
        let roll: f32 = rng.gen();
        if roll < 0.10 {
            // Misread: confident wrong answer
            let wrong = (class_idx + 1 + rng.gen_range(0..CLASS_NAMES.len() - 1))
                % CLASS_NAMES.len();
            Ok((Label::class(CLASS_NAMES[wrong]), rng.gen_range(0.55..0.75)))
        } else if roll < 0.25 {
            // Hesitation: right answer, confidence under the gate
            Ok((
                Label::class(CLASS_NAMES[class_idx]),
                rng.gen_range(0.20..0.45),
            ))
        } else {
            Ok((
                Label::class(CLASS_NAMES[class_idx]),
                rng.gen_range(0.65..0.95),
            ))
        }
    }
}

fn class_index(name: &str) -> usize {
    CLASS_NAMES.iter().position(|c| *c == name).unwrap_or(0)
}

fn build_scene() -> Vec<SceneObject> {
    vec![
        SceneObject {
            track_id: 1,
            class_idx: class_index("plastic"),
            enter_frame: 1,
            exit_frame: 260,
            start: (60.0, 180.0),
            velocity: (1.2, 0.1),
            size: (110.0, 90.0),
            growth: 0.0,
        },
        SceneObject {
            track_id: 2,
            class_idx: class_index("glass"),
            enter_frame: 40,
            exit_frame: 140,
            start: (420.0, 90.0),
            velocity: (-0.8, 0.6),
            size: (80.0, 120.0),
            growth: 0.0,
        },
        // Enters small and grows while approaching the camera
        SceneObject {
            track_id: 3,
            class_idx: class_index("battery"),
            enter_frame: 120,
            exit_frame: 260,
            start: (300.0, 320.0),
            velocity: (0.2, -0.3),
            size: (8.0, 8.0),
            growth: 0.6,
        },
    ]
}

fn render_scene(objects: &[SceneObject], frame_seq: u64) -> Frame {
    let mut data = vec![30u8; FRAME_WIDTH * FRAME_HEIGHT * 3];

    for obj in objects {
        if let Some(bbox) = obj.bbox_at(frame_seq) {
            let x1 = (bbox[0].max(0.0) as usize).min(FRAME_WIDTH);
            let y1 = (bbox[1].max(0.0) as usize).min(FRAME_HEIGHT);
            let x2 = (bbox[2].max(0.0) as usize).min(FRAME_WIDTH);
            let y2 = (bbox[3].max(0.0) as usize).min(FRAME_HEIGHT);
            let red = obj.fill_red();
            for y in y1..y2 {
                for x in x1..x2 {
                    let i = (y * FRAME_WIDTH + x) * 3;
                    data[i] = red;
                    data[i + 1] = 80;
                    data[i + 2] = 80;
                }
            }
        }
    }

    Frame {
        data,
        width: FRAME_WIDTH,
        height: FRAME_HEIGHT,
        timestamp_ms: frame_seq as f64 * 33.3,
    }
}

struct RunStats {
    frames: u64,
    tracked_results: usize,
    stable_transitions: usize,
    unknown_votes: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "waste_detection=info".to_string()),
        )
        .init();

    info!("♻️  Waste Classification Smoothing Demo");

    let config = Config::load_or_default("config.yaml")?;
    info!(
        "✓ Config: window={}, staleness={}, conf_cls={:.2}, input={}px",
        config.smoothing.history_window,
        config.smoothing.staleness_window,
        config.fusion.conf_cls,
        config.fusion.input_size
    );

    let store = Arc::new(TrackHistoryStore::new(config.smoothing.history_window));
    let tracker = SimulatedTracker {
        objects: build_scene(),
        frame_seq: 0,
    };
    let classifier = NoisyClassifier {
        rng: RefCell::new(rand::rngs::StdRng::seed_from_u64(7)),
    };
    let scene = build_scene();

    let mut pipeline = Pipeline::new(&config, 0, tracker, classifier, Arc::clone(&store));
    info!("✓ Pipeline ready (stream 0)");

    let mut events_file = std::fs::File::create("votes.jsonl")?;
    let mut stable_labels: HashMap<TrackKey, Label> = HashMap::new();
    let mut stats = RunStats {
        frames: 0,
        tracked_results: 0,
        stable_transitions: 0,
        unknown_votes: 0,
    };
    let mut last_frame: Option<Frame> = None;
    let mut last_results = Vec::new();

    for frame_seq in 1..=TOTAL_FRAMES {
        let frame = render_scene(&scene, frame_seq);
        let results = pipeline.process_frame(&frame);
        stats.frames += 1;
        stats.tracked_results += results.len();

        for tracked in &results {
            if tracked.vote.tier == Tier::Unknown {
                stats.unknown_votes += 1;
            }

            // Log and record each stable-label transition once
            if tracked.vote.tier == Tier::Stable
                && stable_labels.get(&tracked.key) != Some(&tracked.vote.label)
            {
                stable_labels.insert(tracked.key, tracked.vote.label.clone());
                stats.stable_transitions += 1;
                info!(
                    "🏷️  Track {} settled on '{}' (support {}/{}) at frame {}",
                    tracked.key,
                    tracked.vote.label,
                    tracked.vote.support,
                    config.smoothing.history_window,
                    frame_seq
                );

                let line = serde_json::json!({
                    "frame": frame_seq,
                    "track": tracked.key.to_string(),
                    "label": tracked.vote.label.as_str(),
                    "support": tracked.vote.support,
                    "tier": tracked.vote.tier.as_str(),
                });
                writeln!(events_file, "{}", serde_json::to_string(&line)?)?;
            }
        }

        if frame_seq % 50 == 0 {
            info!(
                "Progress: frame {}/{} | live tracks: {} | stable: {}",
                frame_seq,
                TOTAL_FRAMES,
                store.live_tracks(),
                stable_labels.len()
            );
        }

        last_results = results;
        last_frame = Some(frame);
    }

    // Annotated snapshot of the final frame
    if let Some(mut frame) = last_frame.take() {
        for tracked in &last_results {
            display::draw_box(
                &mut frame.data,
                frame.width,
                frame.height,
                tracked.bbox,
                tracked.color,
            );
        }
        match display::encode_rgb_to_jpeg(&frame.data, frame.width, frame.height, 85) {
            Some(jpeg) => {
                std::fs::write("snapshot.jpg", &jpeg)?;
                info!("💾 Annotated snapshot saved to snapshot.jpg");
            }
            None => warn!("Snapshot encoding failed"),
        }
    }

    let live_at_end = store.live_tracks();
    let released = pipeline.shutdown();

    info!("\n📊 Final Report:");
    info!("  Frames processed: {}", stats.frames);
    info!("  Tracked results: {}", stats.tracked_results);
    info!("  Stable label transitions: {}", stats.stable_transitions);
    info!("  Unknown-tier votes: {}", stats.unknown_votes);
    info!("  Live tracks at end: {} (released {})", live_at_end, released);
    info!("💾 Vote transitions written to votes.jsonl");

    Ok(())
}
