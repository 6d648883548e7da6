// src/preprocessing.rs

use anyhow::{bail, Result};

/// Resize an RGB crop to `target × target` with aspect ratio preserved,
/// padding the remainder with white and centering the content.
///
/// The scale maps the larger crop dimension to `target`, so nothing is
/// stretched. Padding offsets use floor division, which makes the
/// transform reproducible for identical inputs.
pub fn letterbox(src: &[u8], src_w: usize, src_h: usize, target: usize) -> Result<Vec<u8>> {
    if src_w == 0 || src_h == 0 || target == 0 {
        bail!("invalid region: {}x{} -> {}", src_w, src_h, target);
    }
    if src.len() < src_w * src_h * 3 {
        bail!(
            "invalid region: buffer holds {} bytes, need {}",
            src.len(),
            src_w * src_h * 3
        );
    }

    let scale = (target as f32 / src_w as f32).min(target as f32 / src_h as f32);
    let new_w = ((src_w as f32 * scale) as usize).max(1).min(target);
    let new_h = ((src_h as f32 * scale) as usize).max(1).min(target);

    let resized = resize_bilinear(src, src_w, src_h, new_w, new_h);

    // White canvas, content centered via floor-divided offsets
    let mut canvas = vec![255u8; target * target * 3];
    let x_offset = (target - new_w) / 2;
    let y_offset = (target - new_h) / 2;

    for row in 0..new_h {
        let src_start = row * new_w * 3;
        let dst_start = ((y_offset + row) * target + x_offset) * 3;
        canvas[dst_start..dst_start + new_w * 3]
            .copy_from_slice(&resized[src_start..src_start + new_w * 3]);
    }

    Ok(canvas)
}

/// Extract a rectangular RGB region from a frame buffer.
/// Coordinates are clamped to the frame; an empty rectangle yields an error.
pub fn crop_region(
    src: &[u8],
    src_w: usize,
    src_h: usize,
    x1: usize,
    y1: usize,
    x2: usize,
    y2: usize,
) -> Result<Vec<u8>> {
    let x2 = x2.min(src_w);
    let y2 = y2.min(src_h);
    if x1 >= x2 || y1 >= y2 {
        bail!("invalid region: ({},{})-({},{})", x1, y1, x2, y2);
    }

    let w = x2 - x1;
    let h = y2 - y1;
    let mut out = Vec::with_capacity(w * h * 3);
    for row in y1..y2 {
        let start = (row * src_w + x1) * 3;
        out.extend_from_slice(&src[start..start + w * 3]);
    }
    Ok(out)
}

/// Bilinear RGB resize.
fn resize_bilinear(src: &[u8], src_w: usize, src_h: usize, dst_w: usize, dst_h: usize) -> Vec<u8> {
    let mut dst = vec![0u8; dst_h * dst_w * 3];

    let x_ratio = src_w as f32 / dst_w as f32;
    let y_ratio = src_h as f32 / dst_h as f32;

    for dy in 0..dst_h {
        for dx in 0..dst_w {
            let sx = dx as f32 * x_ratio;
            let sy = dy as f32 * y_ratio;

            let sx0 = (sx.floor() as usize).min(src_w - 1);
            let sy0 = (sy.floor() as usize).min(src_h - 1);
            let sx1 = (sx0 + 1).min(src_w - 1);
            let sy1 = (sy0 + 1).min(src_h - 1);

            let fx = sx - sx0 as f32;
            let fy = sy - sy0 as f32;

            for c in 0..3 {
                let p00 = src[(sy0 * src_w + sx0) * 3 + c] as f32;
                let p10 = src[(sy0 * src_w + sx1) * 3 + c] as f32;
                let p01 = src[(sy1 * src_w + sx0) * 3 + c] as f32;
                let p11 = src[(sy1 * src_w + sx1) * 3 + c] as f32;

                let val = p00 * (1.0 - fx) * (1.0 - fy)
                    + p10 * fx * (1.0 - fy)
                    + p01 * (1.0 - fx) * fy
                    + p11 * fx * fy;

                dst[(dy * dst_w + dx) * 3 + c] = val.round() as u8;
            }
        }
    }

    dst
}
