//! Supervisory recovery policy
//!
//! The core never retries. Every failure leaves the run loop as an
//! [`AppError`] and this policy decides what the supervisor does with it:
//! stop on a broken device, or reinitialise everything after a short delay.

use embassy_time::Duration;

use crate::app_state::{AppError, Severity};
use crate::config::RecoveryConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Leave the failure text on screen and stop.
    Halt,
    /// Wait, then reset the whole device.
    RestartAfter(Duration),
}

#[derive(Debug, Clone, Copy)]
pub struct RecoveryPolicy {
    restart_delay: Duration,
}

impl RecoveryPolicy {
    pub fn new(config: &RecoveryConfig) -> Self {
        Self {
            restart_delay: Duration::from_millis(config.restart_delay_ms),
        }
    }

    pub fn decide(&self, error: &AppError) -> RecoveryAction {
        match error.severity() {
            Severity::Setup => RecoveryAction::Halt,
            Severity::Transport | Severity::Device => {
                RecoveryAction::RestartAfter(self.restart_delay)
            }
        }
    }
}
