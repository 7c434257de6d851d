// src/direction.rs
//
// Maps contour anchors to left/right steering decisions.
//
// Every contour is considered; the last one whose anchor falls outside the
// dead zone [left_bound, right_bound] decides the tick. When nothing is in
// view the last decisive turn is repeated so a briefly lost ball does not
// let the servo settle back to neutral.

use crate::contours::ContourSet;
use crate::types::{ClassifierConfig, Direction, SteeringCommand, Turn};
use tracing::debug;

pub struct DirectionClassifier {
    left_bound: i32,
    right_bound: i32,
    last_direction: Direction,
}

impl DirectionClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            left_bound: config.left_bound,
            right_bound: config.right_bound,
            last_direction: Direction::Center,
        }
    }

    pub fn last_direction(&self) -> Direction {
        self.last_direction
    }

    /// Start of a new tracking session.
    pub fn reset(&mut self) {
        self.last_direction = Direction::Center;
    }

    /// Decide on at most one command for this tick.
    pub fn classify(&mut self, set: &ContourSet) -> Option<SteeringCommand> {
        if set.is_empty() {
            return self.ball_lost();
        }

        let mut decision = None;
        for contour in &set.contours {
            let Some(anchor) = contour.anchor() else {
                continue;
            };
            if let Some(turn) = self.turn_for(anchor.x) {
                debug!("{:?} anchor x={} -> {:?}", contour.kind, anchor.x, turn);
                self.last_direction = turn.into();
                decision = Some(SteeringCommand::fresh(turn));
            } else {
                debug!("{:?} anchor x={} in dead zone", contour.kind, anchor.x);
            }
        }
        decision
    }

    fn turn_for(&self, x: i32) -> Option<Turn> {
        if x < self.left_bound {
            Some(Turn::Left)
        } else if x > self.right_bound {
            Some(Turn::Right)
        } else {
            None
        }
    }

    fn ball_lost(&self) -> Option<SteeringCommand> {
        let turn = match self.last_direction {
            Direction::Left => Turn::Left,
            Direction::Right => Turn::Right,
            Direction::Center => return None,
        };
        debug!("Ball lost, holding {:?}", turn);
        Some(SteeringCommand::reasserted(turn))
    }
}

impl Default for DirectionClassifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contours::{find_contours, BorderKind, Contour, HierarchyEntry, Point};
    use crate::types::Mask;

    fn square_mask(x: usize) -> Mask {
        let mut mask = Mask::new(640, 480);
        mask.fill_rect(x, 200, 40, 40);
        mask
    }

    fn contour_at(x: i32) -> Contour {
        Contour {
            points: vec![Point::new(x, 10), Point::new(x + 5, 10)],
            kind: BorderKind::Outer,
        }
    }

    /// Top-level contours listed in the given order.
    fn set_of(xs: &[i32]) -> ContourSet {
        ContourSet {
            contours: xs.iter().map(|&x| contour_at(x)).collect(),
            hierarchy: (0..xs.len())
                .map(|i| HierarchyEntry {
                    next: (i + 1 < xs.len()).then_some(i + 1),
                    ..Default::default()
                })
                .collect(),
        }
    }

    fn classifier_in(state: Direction) -> DirectionClassifier {
        let mut classifier = DirectionClassifier::default();
        match state {
            Direction::Left => {
                classifier.classify(&set_of(&[0]));
            }
            Direction::Right => {
                classifier.classify(&set_of(&[600]));
            }
            Direction::Center => {}
        }
        assert_eq!(classifier.last_direction(), state);
        classifier
    }

    #[test]
    fn test_starts_centered() {
        assert_eq!(DirectionClassifier::default().last_direction(), Direction::Center);
    }

    #[test]
    fn test_square_left_of_bound() {
        let mut classifier = DirectionClassifier::default();
        let set = find_contours(&square_mask(50));
        let cmd = classifier.classify(&set);
        assert_eq!(cmd, Some(SteeringCommand::fresh(Turn::Left)));
        assert_eq!(classifier.last_direction(), Direction::Left);
    }

    #[test]
    fn test_square_right_of_bound() {
        let mut classifier = DirectionClassifier::default();
        let set = find_contours(&square_mask(450));
        let cmd = classifier.classify(&set);
        assert_eq!(cmd, Some(SteeringCommand::fresh(Turn::Right)));
        assert_eq!(classifier.last_direction(), Direction::Right);
    }

    #[test]
    fn test_square_in_dead_zone_keeps_state() {
        for prior in [Direction::Left, Direction::Center, Direction::Right] {
            let mut classifier = classifier_in(prior);
            let set = find_contours(&square_mask(300));
            assert_eq!(classifier.classify(&set), None);
            assert_eq!(classifier.last_direction(), prior);
        }
    }

    #[test]
    fn test_bounds_are_exclusive() {
        let mut classifier = DirectionClassifier::default();
        assert_eq!(classifier.classify(&set_of(&[230])), None);
        assert_eq!(classifier.classify(&set_of(&[410])), None);
        assert_eq!(
            classifier.classify(&set_of(&[229])),
            Some(SteeringCommand::fresh(Turn::Left))
        );
        assert_eq!(
            classifier.classify(&set_of(&[411])),
            Some(SteeringCommand::fresh(Turn::Right))
        );
    }

    #[test]
    fn test_lost_ball_repeats_last_turn() {
        let mut classifier = classifier_in(Direction::Left);
        let empty = find_contours(&Mask::new(640, 480));
        assert_eq!(
            classifier.classify(&empty),
            Some(SteeringCommand::reasserted(Turn::Left))
        );
        assert_eq!(classifier.last_direction(), Direction::Left);
    }

    #[test]
    fn test_lost_ball_while_centered_is_silent() {
        let mut classifier = DirectionClassifier::default();
        assert_eq!(classifier.classify(&ContourSet::default()), None);
        assert_eq!(classifier.last_direction(), Direction::Center);
    }

    #[test]
    fn test_tracking_sequence() {
        let mut classifier = DirectionClassifier::default();

        assert_eq!(
            classifier.classify(&set_of(&[100])),
            Some(SteeringCommand::fresh(Turn::Left))
        );
        assert_eq!(
            classifier.classify(&ContourSet::default()),
            Some(SteeringCommand::reasserted(Turn::Left))
        );
        assert_eq!(
            classifier.classify(&set_of(&[500])),
            Some(SteeringCommand::fresh(Turn::Right))
        );
        assert_eq!(classifier.classify(&set_of(&[300])), None);
        assert_eq!(classifier.last_direction(), Direction::Right);
    }

    #[test]
    fn test_last_decisive_contour_wins() {
        let mut classifier = DirectionClassifier::default();
        let cmd = classifier.classify(&set_of(&[100, 500]));
        assert_eq!(cmd, Some(SteeringCommand::fresh(Turn::Right)));
        assert_eq!(classifier.last_direction(), Direction::Right);

        // A trailing dead-zone contour does not undo the decision.
        let cmd = classifier.classify(&set_of(&[500, 100, 300]));
        assert_eq!(cmd, Some(SteeringCommand::fresh(Turn::Left)));
        assert_eq!(classifier.last_direction(), Direction::Left);
    }

    #[test]
    fn test_two_blobs_from_mask() {
        // The lower blob is found later, so it is listed first and the
        // upper-left blob decides the tick.
        let mut mask = Mask::new(640, 480);
        mask.fill_rect(100, 100, 30, 30);
        mask.fill_rect(500, 300, 30, 30);
        let set = find_contours(&mask);
        assert_eq!(set.len(), 2);
        assert_eq!(set.contours[0].anchor(), Some(Point::new(500, 300)));

        let mut classifier = DirectionClassifier::default();
        assert_eq!(
            classifier.classify(&set),
            Some(SteeringCommand::fresh(Turn::Left))
        );
        assert_eq!(classifier.last_direction(), Direction::Left);
    }

    #[test]
    fn test_contourless_hierarchy_is_ball_lost() {
        let mut classifier = classifier_in(Direction::Right);
        let empty = find_contours(&Mask::new(64, 48));
        assert!(empty.is_empty());
        assert_eq!(
            classifier.classify(&empty),
            Some(SteeringCommand::reasserted(Turn::Right))
        );
    }

    #[test]
    fn test_reset_recenters() {
        let mut classifier = classifier_in(Direction::Right);
        classifier.reset();
        assert_eq!(classifier.last_direction(), Direction::Center);
        assert_eq!(classifier.classify(&ContourSet::default()), None);
    }

    #[test]
    fn test_custom_bounds() {
        let mut classifier = DirectionClassifier::new(ClassifierConfig {
            left_bound: 100,
            right_bound: 200,
        });
        assert_eq!(classifier.classify(&set_of(&[150])), None);
        assert_eq!(
            classifier.classify(&set_of(&[250])),
            Some(SteeringCommand::fresh(Turn::Right))
        );
    }
}
