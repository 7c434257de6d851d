// src/segmentation.rs
//
// Color segmentation: 7x7 box blur, conversion to 8-bit HSV, and an
// inclusive per-channel range test producing a binary mask.

use crate::types::{Frame, HsvRange, Mask, PixelOrder, MASK_OFF, MASK_ON};

pub const BLUR_KERNEL: usize = 7;

/// Blur, convert and threshold a frame. An empty frame yields an empty mask.
pub fn segment(frame: &Frame, range: &HsvRange) -> Mask {
    if frame.is_empty() {
        return Mask::empty();
    }

    let blurred = box_blur(frame, BLUR_KERNEL);
    let hsv = to_hsv(&blurred);
    in_range(&hsv, frame.width, frame.height, range)
}

// ============================================================================
// BLUR
// ============================================================================

/// Reflect-101 border indexing (`dcb|abcd|cba`).
#[inline]
fn reflect_101(mut i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let n = len as isize;
    loop {
        if i < 0 {
            i = -i;
        } else if i >= n {
            i = 2 * n - 2 - i;
        } else {
            return i as usize;
        }
    }
}

/// Normalized box filter with a `ksize x ksize` window, computed per channel.
///
/// Sums are accumulated in two separable passes without intermediate
/// rounding, so the result is the exact window mean rounded to nearest.
pub fn box_blur(frame: &Frame, ksize: usize) -> Frame {
    let (w, h) = (frame.width, frame.height);
    if frame.is_empty() || ksize <= 1 {
        return frame.clone();
    }

    let anchor = (ksize / 2) as isize;
    let mut row_sums = vec![0u32; w * h * 3];

    for y in 0..h {
        for x in 0..w {
            let mut acc = [0u32; 3];
            for k in 0..ksize as isize {
                let sx = reflect_101(x as isize + k - anchor, w);
                let i = (y * w + sx) * 3;
                for c in 0..3 {
                    acc[c] += frame.data[i + c] as u32;
                }
            }
            let o = (y * w + x) * 3;
            row_sums[o..o + 3].copy_from_slice(&acc);
        }
    }

    let area = (ksize * ksize) as u32;
    let mut data = vec![0u8; w * h * 3];

    for y in 0..h {
        for x in 0..w {
            let mut acc = [0u32; 3];
            for k in 0..ksize as isize {
                let sy = reflect_101(y as isize + k - anchor, h);
                let i = (sy * w + x) * 3;
                for c in 0..3 {
                    acc[c] += row_sums[i + c];
                }
            }
            let o = (y * w + x) * 3;
            for c in 0..3 {
                data[o + c] = ((acc[c] + area / 2) / area) as u8;
            }
        }
    }

    Frame {
        data,
        width: w,
        height: h,
        timestamp_ms: frame.timestamp_ms,
        pixel_order: frame.pixel_order,
    }
}

// ============================================================================
// HSV CONVERSION
// ============================================================================

/// Convert one RGB pixel to 8-bit HSV.
/// Returns (H: 0-179, S: 0-255, V: 0-255); hue is half the angle in degrees.
#[inline]
pub fn pixel_to_hsv(r: u8, g: u8, b: u8) -> [u8; 3] {
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = (v - min) as f32;
    let vf = v as f32;

    let s = if v == 0 {
        0.0
    } else {
        (255.0 * delta / vf).round()
    };

    let h = if delta == 0.0 {
        0.0
    } else {
        let deg = if v == r {
            60.0 * (gf - bf) / delta
        } else if v == g {
            120.0 + 60.0 * (bf - rf) / delta
        } else {
            240.0 + 60.0 * (rf - gf) / delta
        };
        let deg = if deg < 0.0 { deg + 360.0 } else { deg };
        (deg / 2.0).round() % 180.0
    };

    [h as u8, s as u8, v]
}

/// Convert a frame to a packed HSV buffer (3 bytes per pixel).
pub fn to_hsv(frame: &Frame) -> Vec<u8> {
    let mut out = Vec::with_capacity(frame.width * frame.height * 3);
    for px in frame.data[..frame.width * frame.height * 3].chunks_exact(3) {
        let (r, g, b) = match frame.pixel_order {
            PixelOrder::Rgb => (px[0], px[1], px[2]),
            PixelOrder::Bgr => (px[2], px[1], px[0]),
        };
        out.extend_from_slice(&pixel_to_hsv(r, g, b));
    }
    out
}

// ============================================================================
// THRESHOLD
// ============================================================================

/// Mark every pixel whose H, S and V all lie in the closed range.
pub fn in_range(hsv: &[u8], width: usize, height: usize, range: &HsvRange) -> Mask {
    let mut mask = Mask::new(width, height);
    for (i, px) in hsv.chunks_exact(3).take(width * height).enumerate() {
        mask.data[i] = if range.contains([px[0], px[1], px[2]]) {
            MASK_ON
        } else {
            MASK_OFF
        };
    }
    mask
}
