//! Drag tracking for the primary control

use shared_protocol::Point;

/// Movement beyond which a press becomes a drag
pub const DEFAULT_DRAG_THRESHOLD_PX: f32 = 10.0;

#[derive(Debug, Clone, Copy)]
struct Gesture {
    initial_position: Point,
    initial_touch: (f32, f32),
    dragging: bool,
    over_zone: bool,
}

/// Result of one move event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragMove {
    /// New widget position
    pub position: Point,
    /// This move crossed the threshold for the first time
    pub drag_started: bool,
    /// `Some(entered)` only when the widget crossed the zone boundary
    pub zone_crossing: Option<bool>,
}

/// What a release means
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// Dropped onto the dismiss zone
    Dismiss,
    /// Never moved past the threshold
    Tap,
    /// Dragged somewhere else
    Dropped,
}

/// Turns raw touch coordinates into drag state. Pure; no rendering.
#[derive(Debug, Clone)]
pub struct DragTracker {
    threshold: f32,
    gesture: Option<Gesture>,
}

impl DragTracker {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            gesture: None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.gesture.is_some_and(|g| g.dragging)
    }

    pub fn is_over_zone(&self) -> bool {
        self.gesture.is_some_and(|g| g.over_zone)
    }

    pub fn press(&mut self, widget_position: Point, x: f32, y: f32) {
        self.gesture = Some(Gesture {
            initial_position: widget_position,
            initial_touch: (x, y),
            dragging: false,
            over_zone: false,
        });
    }

    /// Track a move. `over_zone` hit-tests a candidate widget position.
    pub fn movement(
        &mut self,
        x: f32,
        y: f32,
        over_zone: impl Fn(Point) -> bool,
    ) -> Option<DragMove> {
        let threshold = self.threshold;
        let gesture = self.gesture.as_mut()?;

        let dx = x - gesture.initial_touch.0;
        let dy = y - gesture.initial_touch.1;

        let mut drag_started = false;
        if !gesture.dragging && (dx.abs() > threshold || dy.abs() > threshold) {
            gesture.dragging = true;
            drag_started = true;
        }

        let position = gesture.initial_position.offset(dx as i32, dy as i32);
        let now_over = over_zone(position);
        let zone_crossing = if now_over != gesture.over_zone {
            gesture.over_zone = now_over;
            Some(now_over)
        } else {
            None
        };

        Some(DragMove {
            position,
            drag_started,
            zone_crossing,
        })
    }

    /// Finish the gesture
    pub fn release(&mut self) -> Option<Release> {
        let gesture = self.gesture.take()?;
        Some(if gesture.over_zone {
            Release::Dismiss
        } else if !gesture.dragging {
            Release::Tap
        } else {
            Release::Dropped
        })
    }

    pub fn cancel(&mut self) {
        self.gesture = None;
    }
}

impl Default for DragTracker {
    fn default() -> Self {
        Self::new(DEFAULT_DRAG_THRESHOLD_PX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn below_500(position: Point) -> bool {
        position.y > 500
    }

    #[test]
    fn test_small_jitter_is_a_tap() {
        let mut tracker = DragTracker::default();
        tracker.press(Point::new(100, 100), 10.0, 10.0);

        let step = tracker.movement(15.0, 18.0, below_500).unwrap();
        assert!(!step.drag_started);
        assert_eq!(step.position, Point::new(105, 108));
        assert!(!tracker.is_dragging());

        assert_eq!(tracker.release(), Some(Release::Tap));
    }

    #[test]
    fn test_drag_starts_once() {
        let mut tracker = DragTracker::default();
        tracker.press(Point::new(100, 100), 0.0, 0.0);

        assert!(tracker.movement(0.0, 11.0, below_500).unwrap().drag_started);
        assert!(!tracker.movement(0.0, 40.0, below_500).unwrap().drag_started);
        assert_eq!(tracker.release(), Some(Release::Dropped));
    }

    #[test]
    fn test_zone_crossings_are_edge_triggered() {
        let mut tracker = DragTracker::default();
        tracker.press(Point::new(100, 100), 0.0, 0.0);

        let crossings: Vec<Option<bool>> = [50.0, 450.0, 420.0, 430.0, 300.0, 410.0]
            .iter()
            .map(|dy| tracker.movement(0.0, *dy, below_500).unwrap().zone_crossing)
            .collect();

        assert_eq!(
            crossings,
            vec![None, Some(true), None, None, Some(false), Some(true)]
        );
        assert!(tracker.is_over_zone());
        assert_eq!(tracker.release(), Some(Release::Dismiss));
    }

    #[test]
    fn test_move_without_press_is_ignored() {
        let mut tracker = DragTracker::default();
        assert!(tracker.movement(50.0, 50.0, below_500).is_none());
        assert!(tracker.release().is_none());
    }
}
