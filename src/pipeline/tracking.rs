// src/pipeline/tracking.rs
//
// One full pass per tick:
//   Frame → segment → refine → contours → classify → command
//
// The classifier's last direction is the only state carried between ticks.

use crate::contours::find_contours;
use crate::direction::DirectionClassifier;
use crate::morphology::{refine, RefineStrategy};
use crate::segmentation::segment;
use crate::types::{Config, Direction, Frame, HsvRange, Mask, SteeringCommand};
use tracing::debug;

#[derive(Debug)]
pub enum TickOutcome {
    /// The source could not be read this tick.
    SourceError,
    /// No frame, or a zero-sized one. Nothing was computed.
    EmptyFrame,
    Tracked(TickReport),
}

impl TickOutcome {
    #[cfg(test)]
    pub fn command(&self) -> Option<SteeringCommand> {
        match self {
            TickOutcome::Tracked(report) => report.command,
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct TickReport {
    pub command: Option<SteeringCommand>,
    pub contour_count: usize,
    pub anchor_xs: Vec<i32>,
    pub direction: Direction,
    /// Segmenter output before refinement, for display only.
    pub mask: Mask,
}

pub struct TrackingPipeline {
    classifier: DirectionClassifier,
    strategy: RefineStrategy,
}

impl TrackingPipeline {
    pub fn new(config: &Config) -> Self {
        Self {
            classifier: DirectionClassifier::new(config.classifier),
            strategy: RefineStrategy::from_chained(config.morphology.chained),
        }
    }

    #[cfg(test)]
    pub fn direction(&self) -> Direction {
        self.classifier.last_direction()
    }

    pub fn reset(&mut self) {
        self.classifier.reset();
    }

    pub fn process(&mut self, frame: Option<&Frame>, range: &HsvRange) -> TickOutcome {
        let frame = match frame {
            Some(frame) if !frame.is_empty() => frame,
            _ => {
                debug!("Empty frame, skipping tick");
                return TickOutcome::EmptyFrame;
            }
        };

        let mask = segment(frame, range);
        if mask.is_empty() {
            return TickOutcome::EmptyFrame;
        }

        let refined = refine(&mask, self.strategy);
        let contours = find_contours(&refined);
        let command = self.classifier.classify(&contours);

        let anchor_xs: Vec<i32> = contours
            .contours
            .iter()
            .filter_map(|c| c.anchor())
            .map(|p| p.x)
            .collect();

        TickOutcome::Tracked(TickReport {
            command,
            contour_count: contours.len(),
            anchor_xs,
            direction: self.classifier.last_direction(),
            mask,
        })
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::types::{Frame, HsvRange, PixelOrder};

    pub const RED_BGR: [u8; 3] = [0, 0, 255];

    pub fn red_range() -> HsvRange {
        HsvRange::new([0, 100, 100], [10, 255, 255])
    }

    /// Black 640x120 frame with a 40x40 red ball whose left edge is at `x`.
    pub fn ball_frame(x: usize) -> Frame {
        let mut frame = Frame::filled(640, 120, [0, 0, 0], PixelOrder::Bgr);
        frame.fill_rect(x, 40, 40, 40, RED_BGR);
        frame
    }

    pub fn empty_scene() -> Frame {
        Frame::filled(640, 120, [0, 0, 0], PixelOrder::Bgr)
    }
}
