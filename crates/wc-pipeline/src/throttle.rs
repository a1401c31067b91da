//! Rate limiting for outbound notifications.

use std::time::{Duration, Instant};

/// Admits at most one unforced notification per window.
///
/// The window starts when the throttle is created, so progress reported in
/// the first window of a job is dropped unless forced. Dropped messages are
/// not queued.
#[derive(Debug, Clone)]
pub struct NotificationThrottle {
    window: Duration,
    last_sent_at: Instant,
}

impl NotificationThrottle {
    pub fn new(window: Duration) -> Self {
        Self::starting_at(window, Instant::now())
    }

    pub fn starting_at(window: Duration, start: Instant) -> Self {
        Self {
            window,
            last_sent_at: start,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Decide whether a message may go out now.
    pub fn permit(&mut self, force: bool) -> bool {
        self.permit_at(Instant::now(), force)
    }

    /// Decide at `now`; a permitted message resets the window.
    ///
    /// Unforced messages pass only once strictly more than the window has
    /// elapsed.
    pub fn permit_at(&mut self, now: Instant, force: bool) -> bool {
        let elapsed = now.saturating_duration_since(self.last_sent_at);
        if force || elapsed > self.window {
            self.last_sent_at = now;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(2);

    #[test]
    fn unforced_calls_inside_window_are_dropped() {
        let t0 = Instant::now();
        let mut throttle = NotificationThrottle::starting_at(WINDOW, t0);
        let first = t0 + Duration::from_millis(2500);
        assert!(throttle.permit_at(first, false));
        assert!(!throttle.permit_at(first + Duration::from_millis(500), false));
    }

    #[test]
    fn forced_calls_always_pass() {
        let t0 = Instant::now();
        let mut throttle = NotificationThrottle::starting_at(WINDOW, t0);
        assert!(throttle.permit_at(t0, true));
        assert!(throttle.permit_at(t0 + Duration::from_millis(500), true));
    }

    #[test]
    fn window_starts_at_creation() {
        let t0 = Instant::now();
        let mut throttle = NotificationThrottle::starting_at(WINDOW, t0);
        assert!(!throttle.permit_at(t0 + Duration::from_millis(1999), false));
        assert!(throttle.permit_at(t0 + Duration::from_millis(2001), false));
    }

    #[test]
    fn exactly_one_window_is_not_enough() {
        let t0 = Instant::now();
        let mut throttle = NotificationThrottle::starting_at(WINDOW, t0);
        assert!(!throttle.permit_at(t0 + WINDOW, false));
    }

    #[test]
    fn forced_send_resets_window() {
        let t0 = Instant::now();
        let mut throttle = NotificationThrottle::starting_at(WINDOW, t0);
        let forced = t0 + Duration::from_secs(3);
        assert!(throttle.permit_at(forced, true));
        assert!(!throttle.permit_at(forced + Duration::from_secs(1), false));
    }

    #[test]
    fn zero_window_passes_everything_after_any_elapsed_time() {
        let t0 = Instant::now();
        let mut throttle = NotificationThrottle::starting_at(Duration::ZERO, t0);
        assert!(throttle.permit_at(t0 + Duration::from_millis(1), false));
    }
}
