//! # Refresh Deadlines
//!
//! Lazy, jittered TTLs. Nothing runs on a timer: each entry stores the instant
//! after which it is stale and compares it with "now" when it is next read.
//!
//! A deadline lands at a uniformly random point in the back half of the
//! refresh interval, so entries created together (e.g. a fleet restart) do
//! not refresh in lockstep and no entry refreshes right after a refresh.

use std::time::Duration;
use tokio::time::Instant;

/// Deadline for the next refresh of one cached item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RefreshDeadline {
    /// `None` until the first successful refresh
    next_refresh_at: Option<Instant>,
}

impl RefreshDeadline {
    /// True when the item was never refreshed or `now` is past the deadline
    pub(crate) fn is_due(&self, now: Instant) -> bool {
        self.next_refresh_at.is_none_or(|at| now > at)
    }

    /// Schedule the next refresh relative to `now`
    pub(crate) fn reset(&mut self, now: Instant, interval: Duration) {
        self.next_refresh_at = Some(next_refresh_at(now, interval));
    }
}

/// `now + T/2 + random() * T/2`
pub(crate) fn next_refresh_at(now: Instant, interval: Duration) -> Instant {
    let half = interval / 2;
    now + half + half.mul_f64(rand::random::<f64>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_within_back_half_of_interval() {
        let now = Instant::now();
        let interval = Duration::from_secs(3600);
        for _ in 0..1000 {
            let at = next_refresh_at(now, interval);
            assert!(at >= now + Duration::from_secs(1800), "Deadline before T/2");
            assert!(at <= now + interval, "Deadline after T");
        }
    }

    #[test]
    fn test_deadlines_are_jittered() {
        let now = Instant::now();
        let interval = Duration::from_secs(3600);
        let first = next_refresh_at(now, interval);
        let differs = (0..100).any(|_| next_refresh_at(now, interval) != first);
        assert!(differs, "100 deadlines should not all be identical");
    }

    #[test]
    fn test_never_refreshed_is_due() {
        let deadline = RefreshDeadline::default();
        assert!(deadline.is_due(Instant::now()));
    }

    #[test]
    fn test_reset_deadline_is_not_due_until_interval_passes() {
        let now = Instant::now();
        let interval = Duration::from_secs(60);
        let mut deadline = RefreshDeadline::default();
        deadline.reset(now, interval);

        assert!(!deadline.is_due(now));
        assert!(!deadline.is_due(now + Duration::from_secs(30)));
        assert!(deadline.is_due(now + Duration::from_secs(61)));
    }
}
