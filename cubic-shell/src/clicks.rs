//! Click detection
//!
//! winit reports raw button presses and releases. A release counts as a
//! click when the pointer stayed within `CLICK_SLOP` pixels of the press, so
//! ending an orbit drag does not select whatever is under the cursor. Two
//! clicks close in time and space make a double click (`count == 2`).

use std::time::{Duration, Instant};

/// Max pointer travel between press and release, in logical pixels
const CLICK_SLOP: f32 = 4.0;
/// Max gap between the two clicks of a double click
const DOUBLE_CLICK_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Default)]
pub struct ClickTracker {
    press: Option<(f32, f32)>,
    last_click: Option<(Instant, f32, f32, u32)>,
}

impl ClickTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, x: f32, y: f32) {
        self.press = Some((x, y));
    }

    /// Click count for this release, or `None` if it ended a drag.
    pub fn release(&mut self, x: f32, y: f32, now: Instant) -> Option<u32> {
        let (px, py) = self.press.take()?;
        if !within_slop(px, py, x, y) {
            return None;
        }

        let count = match self.last_click {
            Some((at, lx, ly, count))
                if count == 1
                    && now.duration_since(at) <= DOUBLE_CLICK_INTERVAL
                    && within_slop(lx, ly, x, y) =>
            {
                2
            }
            _ => 1,
        };
        self.last_click = Some((now, x, y, count));
        Some(count)
    }
}

fn within_slop(ax: f32, ay: f32, bx: f32, by: f32) -> bool {
    (ax - bx).hypot(ay - by) <= CLICK_SLOP
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_and_double_click() {
        let mut clicks = ClickTracker::new();
        let t0 = Instant::now();

        clicks.press(100.0, 100.0);
        assert_eq!(clicks.release(101.0, 100.0, t0), Some(1));

        clicks.press(101.0, 101.0);
        assert_eq!(clicks.release(101.0, 101.0, t0 + Duration::from_millis(200)), Some(2));

        // A third quick click starts over
        clicks.press(101.0, 101.0);
        assert_eq!(clicks.release(101.0, 101.0, t0 + Duration::from_millis(300)), Some(1));
    }

    #[test]
    fn test_drag_is_not_a_click() {
        let mut clicks = ClickTracker::new();
        clicks.press(100.0, 100.0);
        assert_eq!(clicks.release(180.0, 100.0, Instant::now()), None);
    }

    #[test]
    fn test_slow_second_click() {
        let mut clicks = ClickTracker::new();
        let t0 = Instant::now();
        clicks.press(10.0, 10.0);
        clicks.release(10.0, 10.0, t0);
        clicks.press(10.0, 10.0);
        assert_eq!(clicks.release(10.0, 10.0, t0 + Duration::from_secs(1)), Some(1));
    }

    #[test]
    fn test_release_without_press() {
        let mut clicks = ClickTracker::new();
        assert_eq!(clicks.release(0.0, 0.0, Instant::now()), None);
    }
}
