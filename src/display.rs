// src/display.rs
//
// Presentation adapter: maps resolved votes to the overlay contract
// (color + text) and renders simple box annotations for snapshots.

use crate::types::TrackKey;
use crate::vote::{ResolvedVote, Tier};

pub type Rgb = (u8, u8, u8);

/// Stable majority.
pub const COLOR_STABLE: Rgb = (0, 255, 0);
/// Majority exists but support is under the stability bar.
pub const COLOR_TENTATIVE: Rgb = (255, 255, 0);
/// The winning vote is Unknown.
pub const COLOR_UNKNOWN: Rgb = (255, 0, 0);

pub fn tier_color(tier: Tier) -> Rgb {
    match tier {
        Tier::Stable => COLOR_STABLE,
        Tier::Tentative => COLOR_TENTATIVE,
        Tier::Unknown => COLOR_UNKNOWN,
    }
}

/// Overlay text for one tracked object, e.g. `ID:3 plastic`.
pub fn label_text(key: TrackKey, vote: &ResolvedVote) -> String {
    format!("ID:{} {}", key.track, vote.label)
}

/// Confidence band for single-shot (non-tracked) classification
/// results, as shown by the still-image analysis mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceBand {
    Confident,
    Probable,
    Uncertain,
}

impl ConfidenceBand {
    pub fn from_confidence(conf: f32) -> Self {
        if conf > 0.7 {
            Self::Confident
        } else if conf > 0.5 {
            Self::Probable
        } else {
            Self::Uncertain
        }
    }

    pub fn color(&self) -> Rgb {
        match self {
            Self::Confident => (0, 255, 0),
            Self::Probable => (255, 215, 0),
            Self::Uncertain => (255, 69, 0),
        }
    }
}

/// Draw a 2px rectangle outline onto an RGB frame buffer, clamped to
/// the frame bounds.
pub fn draw_box(frame: &mut [u8], width: usize, height: usize, bbox: [f32; 4], color: Rgb) {
    let x1 = (bbox[0].max(0.0) as usize).min(width.saturating_sub(1));
    let y1 = (bbox[1].max(0.0) as usize).min(height.saturating_sub(1));
    let x2 = (bbox[2].max(0.0) as usize).min(width.saturating_sub(1));
    let y2 = (bbox[3].max(0.0) as usize).min(height.saturating_sub(1));
    if x2 <= x1 || y2 <= y1 {
        return;
    }

    let mut put = |x: usize, y: usize| {
        let i = (y * width + x) * 3;
        frame[i] = color.0;
        frame[i + 1] = color.1;
        frame[i + 2] = color.2;
    };

    for thickness in 0..2usize {
        let top = (y1 + thickness).min(y2);
        let bottom = y2.saturating_sub(thickness).max(y1);
        for x in x1..=x2 {
            put(x, top);
            put(x, bottom);
        }
        let left = (x1 + thickness).min(x2);
        let right = x2.saturating_sub(thickness).max(x1);
        for y in y1..=y2 {
            put(left, y);
            put(right, y);
        }
    }
}

/// Encode an RGB frame to JPEG bytes for snapshot output.
pub fn encode_rgb_to_jpeg(
    rgb_data: &[u8],
    width: usize,
    height: usize,
    quality: u8,
) -> Option<Vec<u8>> {
    use image::{ImageBuffer, RgbImage};
    use std::io::Cursor;

    let expected_len = width * height * 3;
    if rgb_data.len() < expected_len {
        return None;
    }

    let img: RgbImage =
        ImageBuffer::from_raw(width as u32, height as u32, rgb_data[..expected_len].to_vec())?;

    let mut buf = Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality);
    if img.write_with_encoder(encoder).is_ok() {
        Some(buf.into_inner())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Label;

    #[test]
    fn test_tier_colors() {
        assert_eq!(tier_color(Tier::Stable), (0, 255, 0));
        assert_eq!(tier_color(Tier::Tentative), (255, 255, 0));
        assert_eq!(tier_color(Tier::Unknown), (255, 0, 0));
    }

    #[test]
    fn test_label_text_format() {
        let vote = ResolvedVote {
            label: Label::class("plastic"),
            support: 7,
            tier: Tier::Stable,
        };
        assert_eq!(label_text(TrackKey::new(0, 3), &vote), "ID:3 plastic");
    }

    #[test]
    fn test_confidence_bands() {
        assert_eq!(
            ConfidenceBand::from_confidence(0.85),
            ConfidenceBand::Confident
        );
        assert_eq!(
            ConfidenceBand::from_confidence(0.6),
            ConfidenceBand::Probable
        );
        assert_eq!(
            ConfidenceBand::from_confidence(0.3),
            ConfidenceBand::Uncertain
        );
    }

    #[test]
    fn test_draw_box_writes_outline_pixels() {
        let mut frame = vec![0u8; 20 * 20 * 3];
        draw_box(&mut frame, 20, 20, [2.0, 2.0, 10.0, 10.0], (0, 255, 0));

        // Corner of the outline is colored
        let i = (2 * 20 + 2) * 3;
        assert_eq!(&frame[i..i + 3], &[0, 255, 0]);
        // Interior stays untouched
        let j = (6 * 20 + 6) * 3;
        assert_eq!(&frame[j..j + 3], &[0, 0, 0]);
    }

    #[test]
    fn test_encode_jpeg_roundtrip_size() {
        let rgb = vec![200u8; 32 * 32 * 3];
        let jpeg = encode_rgb_to_jpeg(&rgb, 32, 32, 85).unwrap();
        assert!(!jpeg.is_empty());
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }
}
