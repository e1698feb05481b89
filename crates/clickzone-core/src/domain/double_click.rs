//! Application-level double-click recognition.
//!
//! The low-level mouse hook never reports double clicks for most windows, so
//! they are reconstructed from button releases: two releases of the same
//! button within the system double-click interval make a double click.
//!
//! The detector does not own a timer.  It stores a monotonic deadline and
//! checks it against the time of the next release, which is equivalent to a
//! timer that resets the state when it fires.

use std::time::{Duration, Instant};

use tracing::trace;

use super::event::MouseButton;

/// Detector state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoubleClickState {
    Idle,
    /// One release of `button` seen; a second one before `deadline` completes a double click.
    Armed {
        button: MouseButton,
        deadline: Instant,
    },
}

/// Two-click state machine driven by button releases.
#[derive(Debug, Clone)]
pub struct DoubleClickDetector {
    interval: Duration,
    state: DoubleClickState,
}

impl DoubleClickDetector {
    /// Creates an idle detector.  `interval` is read once by the caller and
    /// never re-queried.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            state: DoubleClickState::Idle,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> DoubleClickState {
        self.state
    }

    /// Resets an armed detector whose deadline has passed.
    ///
    /// Returns `true` if the state changed.
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.state {
            DoubleClickState::Armed { deadline, .. } if now >= deadline => {
                trace!("double-click wait expired");
                self.state = DoubleClickState::Idle;
                true
            }
            _ => false,
        }
    }

    /// Feeds one button release observed at `now`.
    ///
    /// Returns `true` when this release completes a double click.  Releases
    /// with zero clicks are malformed and leave the state untouched.
    pub fn observe_release(&mut self, button: MouseButton, clicks: u32, now: Instant) -> bool {
        if clicks == 0 {
            return false;
        }
        self.expire(now);

        match self.state {
            DoubleClickState::Armed { button: armed, .. } if armed == button => {
                trace!(?button, "double click recognised");
                self.state = DoubleClickState::Idle;
                true
            }
            _ => {
                self.state = DoubleClickState::Armed {
                    button,
                    deadline: now + self.interval,
                };
                false
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_millis(500);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_two_releases_of_same_button_within_interval_complete_double_click() {
        // Arrange
        let t0 = Instant::now();
        let mut detector = DoubleClickDetector::new(INTERVAL);

        // Act
        let first = detector.observe_release(MouseButton::Left, 1, t0);
        let second = detector.observe_release(MouseButton::Left, 1, t0 + ms(50));

        // Assert
        assert!(!first);
        assert!(second);
        assert_eq!(detector.state(), DoubleClickState::Idle);
    }

    #[test]
    fn test_third_release_starts_a_new_wait() {
        let t0 = Instant::now();
        let mut detector = DoubleClickDetector::new(INTERVAL);
        detector.observe_release(MouseButton::Left, 1, t0);
        detector.observe_release(MouseButton::Left, 1, t0 + ms(50));

        let third = detector.observe_release(MouseButton::Left, 1, t0 + ms(100));

        assert!(!third);
        assert!(matches!(detector.state(), DoubleClickState::Armed { button: MouseButton::Left, .. }));
    }

    #[test]
    fn test_release_of_other_button_rearms_for_that_button() {
        // Arrange
        let t0 = Instant::now();
        let mut detector = DoubleClickDetector::new(INTERVAL);
        detector.observe_release(MouseButton::Left, 1, t0);

        // Act
        let fired = detector.observe_release(MouseButton::Right, 1, t0 + ms(50));

        // Assert
        assert!(!fired);
        assert_eq!(
            detector.state(),
            DoubleClickState::Armed {
                button: MouseButton::Right,
                deadline: t0 + ms(50) + INTERVAL,
            }
        );
    }

    #[test]
    fn test_second_release_after_deadline_does_not_fire() {
        let t0 = Instant::now();
        let mut detector = DoubleClickDetector::new(INTERVAL);
        detector.observe_release(MouseButton::Left, 1, t0);

        let fired = detector.observe_release(MouseButton::Left, 1, t0 + ms(500));

        assert!(!fired);
    }

    #[test]
    fn test_expire_returns_to_idle_once_deadline_passes() {
        // Arrange
        let t0 = Instant::now();
        let mut detector = DoubleClickDetector::new(INTERVAL);
        detector.observe_release(MouseButton::Left, 1, t0);

        // Act / Assert
        assert!(!detector.expire(t0 + ms(499)));
        assert!(detector.expire(t0 + ms(500)));
        assert_eq!(detector.state(), DoubleClickState::Idle);
    }

    #[test]
    fn test_zero_click_release_is_ignored() {
        let t0 = Instant::now();
        let mut detector = DoubleClickDetector::new(INTERVAL);
        detector.observe_release(MouseButton::Left, 1, t0);
        let before = detector.state();

        let fired = detector.observe_release(MouseButton::Left, 0, t0 + ms(10));

        assert!(!fired);
        assert_eq!(detector.state(), before);
    }
}
