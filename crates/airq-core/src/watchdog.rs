//! Watchdog liveness guard
//!
//! The platform watchdog resets the device unless it is fed within its
//! timeout. [`LivenessGuard`] wraps it, feeds it once per tick and keeps track
//! of the largest gap between two feeds so an overrun shows up in the log
//! before the hardware pulls the plug.

use embassy_time::{Duration, Instant};
use log::{error, info};

/// Platform watchdog timer.
pub trait Watchdog {
    fn arm(&mut self, timeout: Duration);
    fn feed(&mut self);
}

pub struct LivenessGuard<W> {
    watchdog: W,
    timeout: Duration,
    last_feed: Instant,
    longest_gap: Duration,
    feeds: u32,
}

impl<W: Watchdog> LivenessGuard<W> {
    /// Arm the watchdog. Counts as the first feed.
    pub fn arm(mut watchdog: W, timeout: Duration, now: Instant) -> Self {
        watchdog.arm(timeout);
        info!("Watchdog armed with {} ms timeout", timeout.as_millis());
        Self {
            watchdog,
            timeout,
            last_feed: now,
            longest_gap: Duration::from_ticks(0),
            feeds: 0,
        }
    }

    pub fn feed(&mut self, now: Instant) {
        let gap = now.saturating_duration_since(self.last_feed);
        if gap > self.timeout {
            error!(
                "Watchdog fed {} ms after the previous feed (timeout {} ms)",
                gap.as_millis(),
                self.timeout.as_millis()
            );
        }
        self.longest_gap = self.longest_gap.max(gap);
        self.last_feed = now;
        self.feeds = self.feeds.saturating_add(1);
        self.watchdog.feed();
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn longest_gap(&self) -> Duration {
        self.longest_gap
    }

    pub fn feeds(&self) -> u32 {
        self.feeds
    }

    pub fn inner(&self) -> &W {
        &self.watchdog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CountingWatchdog;

    #[test]
    fn arm_configures_timeout() {
        let guard = LivenessGuard::arm(
            CountingWatchdog::default(),
            Duration::from_millis(5000),
            Instant::from_millis(0),
        );
        assert_eq!(guard.inner().armed, Some(Duration::from_millis(5000)));
        assert_eq!(guard.inner().feeds, 0);
    }

    #[test]
    fn tracks_longest_gap_between_feeds() {
        let mut guard = LivenessGuard::arm(
            CountingWatchdog::default(),
            Duration::from_millis(5000),
            Instant::from_millis(0),
        );
        guard.feed(Instant::from_millis(50));
        guard.feed(Instant::from_millis(900));
        guard.feed(Instant::from_millis(950));

        assert_eq!(guard.longest_gap(), Duration::from_millis(850));
        assert_eq!(guard.inner().feeds, 3);
        assert_eq!(guard.feeds(), 3);
    }
}
