// src/morphology.rs
//
// Mask cleanup with rectangular structuring elements.

use crate::types::{Mask, MASK_ON};
use image::{GrayImage, Luma};
use imageproc::morphology::{grayscale_dilate, grayscale_erode, Mask as StructuringElement};
use tracing::trace;

pub const ERODE_KERNEL: usize = 12;
pub const DILATE_KERNEL: usize = 24;
pub const PASSES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefineStrategy {
    /// Every erosion and dilation pass reads the segmenter mask; only the
    /// last dilation is kept.
    AsObserved,
    /// Erode twice, then dilate the eroded result twice.
    Chained,
}

impl RefineStrategy {
    pub fn from_chained(chained: bool) -> Self {
        if chained {
            RefineStrategy::Chained
        } else {
            RefineStrategy::AsObserved
        }
    }
}

pub fn refine(mask: &Mask, strategy: RefineStrategy) -> Mask {
    if mask.is_empty() {
        return mask.clone();
    }

    match strategy {
        RefineStrategy::AsObserved => {
            // Both erosions and the first dilation are overwritten by the
            // final dilation of the same input.
            trace!("Refining mask {}x{} as observed", mask.width, mask.height);
            dilate(mask, DILATE_KERNEL)
        }
        RefineStrategy::Chained => {
            let mut out = mask.clone();
            for _ in 0..PASSES {
                out = erode(&out, ERODE_KERNEL);
            }
            for _ in 0..PASSES {
                out = dilate(&out, DILATE_KERNEL);
            }
            out
        }
    }
}

/// Square structuring element of side `ksize`, anchored at `(ksize/2, ksize/2)`.
fn square_element(ksize: usize) -> StructuringElement {
    let side = ksize as u32;
    let anchor = (ksize / 2) as u8;
    StructuringElement::from_image(&GrayImage::from_pixel(side, side, Luma([MASK_ON])), anchor, anchor)
}

/// Min over a `ksize x ksize` square. Pixels beyond the border never erode
/// the mask.
pub fn erode(mask: &Mask, ksize: usize) -> Mask {
    if mask.is_empty() || ksize <= 1 {
        return mask.clone();
    }
    Mask::from_gray_image(grayscale_erode(&mask.to_gray_image(), &square_element(ksize)))
}

/// Max over a `ksize x ksize` square.
pub fn dilate(mask: &Mask, ksize: usize) -> Mask {
    if mask.is_empty() || ksize <= 1 {
        return mask.clone();
    }
    Mask::from_gray_image(grayscale_dilate(&mask.to_gray_image(), &square_element(ksize)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MASK_OFF;

    fn bounding_box(mask: &Mask) -> Option<(usize, usize, usize, usize)> {
        let mut bbox: Option<(usize, usize, usize, usize)> = None;
        for y in 0..mask.height {
            for x in 0..mask.width {
                if mask.get(x, y) == MASK_ON {
                    bbox = Some(match bbox {
                        None => (x, y, x, y),
                        Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
                    });
                }
            }
        }
        bbox
    }

    #[test]
    fn test_dilate_grows_by_anchor_offsets() {
        let mut mask = Mask::new(80, 80);
        mask.fill_rect(30, 30, 10, 10); // x,y in 30..=39
        let out = dilate(&mask, DILATE_KERNEL);
        // Window covers [x-12, x+11], so the square grows 11 left/up, 12 right/down.
        assert_eq!(bounding_box(&out), Some((19, 19, 51, 51)));
        assert_eq!(out.count_on(), 33 * 33);
    }

    #[test]
    fn test_erode_shrinks_and_removes_small_blobs() {
        let mut mask = Mask::new(100, 100);
        mask.fill_rect(10, 10, 40, 40);
        mask.fill_rect(70, 70, 8, 8);
        let out = erode(&mask, ERODE_KERNEL);
        // Window covers [x-6, x+5].
        assert_eq!(bounding_box(&out), Some((16, 16, 44, 44)));
        assert_eq!(out.get(73, 73), MASK_OFF);
    }

    #[test]
    fn test_dilate_at_image_edges() {
        let mut mask = Mask::new(40, 30);
        mask.fill_rect(0, 0, 2, 2);
        mask.fill_rect(38, 28, 2, 2);
        let out = dilate(&mask, DILATE_KERNEL);
        assert_eq!((out.width, out.height), (40, 30));
        // Top-left blob reaches x+12 to the right, bottom-right reaches x-11.
        assert_eq!(out.get(13, 13), MASK_ON);
        assert_eq!(out.get(14, 0), MASK_OFF);
        assert_eq!(out.get(27, 17), MASK_ON);
        assert_eq!(out.get(26, 29), MASK_OFF);
    }

    #[test]
    fn test_erode_keeps_border_pixels() {
        let mut mask = Mask::new(30, 30);
        mask.fill_rect(0, 0, 30, 30);
        assert_eq!(erode(&mask, ERODE_KERNEL).count_on(), 900);
    }

    #[test]
    fn test_as_observed_equals_single_dilation() {
        let mut mask = Mask::new(120, 90);
        mask.fill_rect(10, 10, 5, 5);
        mask.fill_rect(60, 40, 30, 30);
        let refined = refine(&mask, RefineStrategy::AsObserved);
        assert_eq!(refined, dilate(&mask, DILATE_KERNEL));
        // Noise survives because the erosions are discarded.
        assert_eq!(refined.get(12, 12), MASK_ON);
    }

    #[test]
    fn test_chained_drops_noise_keeps_ball() {
        let mut mask = Mask::new(160, 120);
        mask.fill_rect(10, 10, 5, 5);
        mask.fill_rect(80, 40, 40, 40);
        let refined = refine(&mask, RefineStrategy::Chained);
        assert_eq!(refined.get(12, 12), MASK_OFF);
        assert_eq!(refined.get(100, 60), MASK_ON);
    }

    #[test]
    fn test_refine_preserves_dimensions() {
        let mask = Mask::new(33, 17);
        for strategy in [RefineStrategy::AsObserved, RefineStrategy::Chained] {
            let refined = refine(&mask, strategy);
            assert_eq!((refined.width, refined.height), (33, 17));
            assert_eq!(refined.count_on(), 0);
        }
    }

    #[test]
    fn test_strategy_from_flag() {
        assert_eq!(RefineStrategy::from_chained(false), RefineStrategy::AsObserved);
        assert_eq!(RefineStrategy::from_chained(true), RefineStrategy::Chained);
    }
}
