//! Hardware-independent core for the air-quality display firmware
//!
//! This crate holds everything that does not touch a concrete peripheral: the
//! display mode controller, the sampling facade in front of the air-quality
//! sensor and temperature probe, the MQTT telemetry publisher, the watchdog
//! liveness guard, the boot sequence and the screens drawn on the 128x64
//! monochrome panel.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both the
//! ESP32-S3 target and desktop hosts (for the simulator and tests).

#![no_std]

extern crate alloc;
#[cfg(test)]
extern crate std;

pub mod animations;
pub mod app_state;
pub mod boot;
pub mod config;
pub mod controller;
pub mod framebuffer;
pub mod metrics;
pub mod network;
pub mod recovery;
pub mod sampling;
pub mod screens;
pub mod sensors;
pub mod telemetry;
pub mod watchdog;

#[cfg(test)]
pub(crate) mod testing;
