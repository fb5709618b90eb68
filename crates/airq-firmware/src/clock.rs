use embassy_time::Instant;

use airq_core::controller::Clock;

/// Monotonic time from the embassy time driver.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
