use grwl::MouseButton;

/// Presses closer together than this are treated as contact bounce.
pub const DOUBLE_CLICK_MIN: f64 = 0.02;

/// Presses further apart than this are independent clicks.
pub const DOUBLE_CLICK_MAX: f64 = 0.2;

/// Classifies button presses as single or double clicks, per button.
#[derive(Clone, Debug, Default)]
pub struct ClickTracker {
    last_press: [Option<f64>; MouseButton::COUNT],
}

impl ClickTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a press at `time` seconds and returns whether it forms a
    /// double click with the previous press of the same button.
    pub fn press(&mut self, button: MouseButton, time: f64) -> bool {
        let Some(slot) = button.index().and_then(|i| self.last_press.get_mut(i)) else {
            return false;
        };

        let double = slot.map_or(false, |last| {
            let elapsed = time - last;
            DOUBLE_CLICK_MIN < elapsed && elapsed < DOUBLE_CLICK_MAX
        });

        *slot = Some(time);
        double
    }

    pub fn reset(&mut self) {
        self.last_press = Default::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_click_window() {
        let mut clicks = ClickTracker::new();
        assert!(!clicks.press(MouseButton::Left, 0.0));
        assert!(clicks.press(MouseButton::Left, 0.1));

        let mut clicks = ClickTracker::new();
        assert!(!clicks.press(MouseButton::Left, 0.0));
        assert!(!clicks.press(MouseButton::Left, 0.01));

        let mut clicks = ClickTracker::new();
        assert!(!clicks.press(MouseButton::Left, 0.0));
        assert!(!clicks.press(MouseButton::Left, 0.25));
    }

    #[test]
    fn bounds_are_exclusive() {
        let mut clicks = ClickTracker::new();
        clicks.press(MouseButton::Left, 1.0);
        assert!(!clicks.press(MouseButton::Left, 1.0 + DOUBLE_CLICK_MAX + 1e-9));

        clicks.reset();
        clicks.press(MouseButton::Left, 1.0);
        assert!(!clicks.press(MouseButton::Left, 1.0 + DOUBLE_CLICK_MIN - 1e-9));
    }

    #[test]
    fn buttons_are_independent() {
        let mut clicks = ClickTracker::new();
        clicks.press(MouseButton::Left, 0.0);
        assert!(!clicks.press(MouseButton::Right, 0.1));
        assert!(clicks.press(MouseButton::Left, 0.1));

        // Untracked buttons never double click.
        assert!(!clicks.press(MouseButton::Other(1), 0.0));
        assert!(!clicks.press(MouseButton::Other(1), 0.1));
    }
}
