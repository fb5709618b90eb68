//! RTC watchdog

use esp_hal::rtc_cntl::{Rtc, RwdtStage};
use log::debug;

use airq_core::watchdog::Watchdog;

pub struct RtcWatchdog<'d> {
    rtc: Rtc<'d>,
}

impl<'d> RtcWatchdog<'d> {
    pub fn new(rtc: Rtc<'d>) -> Self {
        Self { rtc }
    }
}

impl Watchdog for RtcWatchdog<'_> {
    fn arm(&mut self, timeout: embassy_time::Duration) {
        self.rtc.rwdt.set_timeout(
            RwdtStage::Stage0,
            esp_hal::time::Duration::from_millis(timeout.as_millis()),
        );
        self.rtc.rwdt.enable();
        debug!("RWDT stage 0 enabled");
    }

    fn feed(&mut self) {
        self.rtc.rwdt.feed();
    }
}
