//! Device configuration
//!
//! Everything the firmware needs is an embedded constant: the values of
//! [`Config::default`] match the reference device, and the firmware only
//! overrides the Wi-Fi credentials and broker address from its build
//! environment.

use embassy_time::Duration;
use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::app_state::AppError;
use crate::controller::DisplayMode;
use crate::sensors::PROBE_CONVERSION_TIME;
use crate::telemetry::TelemetryChannel;

/// Number of display modes, and so the longest possible cycle.
pub const MAX_CYCLE_LEN: usize = 5;

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct Config<'a> {
    pub internet: InternetConfig<'a>,
    pub mqtt: MqttConfig<'a>,
    pub display: DisplayConfig,
    pub schedule: ScheduleConfig,
    pub watchdog: WatchdogConfig,
    pub recovery: RecoveryConfig,
    pub association: AssociationConfig,
    pub analog: AnalogCalibration,
}

impl Default for Config<'_> {
    fn default() -> Self {
        Self {
            internet: InternetConfig::default(),
            mqtt: MqttConfig::default(),
            display: DisplayConfig::default(),
            schedule: ScheduleConfig::default(),
            watchdog: WatchdogConfig::default(),
            recovery: RecoveryConfig::default(),
            association: AssociationConfig::default(),
            analog: AnalogCalibration::default(),
        }
    }
}

impl Config<'_> {
    /// Reject configurations that would break the controller or starve the
    /// watchdog.
    pub fn validate(&self) -> Result<(), AppError> {
        let schedule = &self.schedule;

        if schedule.cycle.is_empty() {
            return Err(AppError::Config("display cycle is empty"));
        }

        for mode in schedule.cycle.iter() {
            if schedule.dwell_ms(*mode) <= schedule.entry_window_ms {
                return Err(AppError::Config("dwell must be longer than the entry window"));
            }
        }

        if schedule.tick_ms == 0 {
            return Err(AppError::Config("tick interval must be non-zero"));
        }

        if schedule.tick_ms >= self.watchdog.timeout_ms {
            return Err(AppError::Config(
                "tick interval must be shorter than the watchdog timeout",
            ));
        }

        if self.mqtt.publish_timeout_ms == 0 {
            return Err(AppError::Config("publish timeout must be non-zero"));
        }

        // The sensor entry burst is the longest blocking stretch between two
        // feeds: one temperature read, a publish per channel and the tick sleep.
        let analog_ms = self.analog.samples as u64 * self.analog.sample_spacing_ms as u64;
        let publish_ms = TelemetryChannel::ALL.len() as u64 * self.mqtt.publish_timeout_ms;
        let burst_ms =
            PROBE_CONVERSION_TIME.as_millis().max(analog_ms) + publish_ms + schedule.tick_ms;
        if burst_ms >= self.watchdog.timeout_ms {
            return Err(AppError::Config(
                "sensor entry burst does not fit in the watchdog timeout",
            ));
        }

        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Default, Clone)]
pub struct InternetConfig<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
}

/// Broker connection and the three telemetry topics.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MqttConfig<'a> {
    pub broker: &'a str,
    pub port: u16,
    pub client_id: &'a str,
    #[serde(borrow)]
    pub username: Option<&'a str>,
    #[serde(borrow)]
    pub password: Option<&'a str>,
    pub keep_alive_secs: u16,
    pub aqi_topic: &'a str,
    pub eco2_topic: &'a str,
    pub tvoc_topic: &'a str,
    /// Longest a single publish may block before it counts as failed.
    pub publish_timeout_ms: u64,
}

impl Default for MqttConfig<'_> {
    fn default() -> Self {
        Self {
            broker: "192.168.1.138",
            port: 1883,
            client_id: "airq",
            username: None,
            password: None,
            keep_alive_secs: 3600,
            aqi_topic: "home-assistant/livingroom/aqi",
            eco2_topic: "home-assistant/livingroom/eco2",
            tvoc_topic: "home-assistant/livingroom/tvoc",
            publish_timeout_ms: 1000,
        }
    }
}

impl MqttConfig<'_> {
    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }
}

/// Panel settings. The geometry is fixed by the 128x64 layouts in
/// [`crate::screens`].
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct DisplayConfig {
    pub contrast: u8,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { contrast: 0xCF }
    }
}

/// Mode cycle and timing of the display controller, all in milliseconds.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ScheduleConfig {
    pub cycle: Vec<DisplayMode, MAX_CYCLE_LEN>,
    pub show_sensor_ms: u64,
    pub show_ip_ms: u64,
    pub display_off_ms: u64,
    pub spinner_ms: u64,
    pub bounce_ms: u64,
    pub entry_window_ms: u64,
    pub tick_ms: u64,
    pub spinner_frame_ms: u64,
    pub bounce_step_ms: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        let mut cycle = Vec::new();
        for mode in [
            DisplayMode::ShowSensor,
            DisplayMode::ShowIp,
            DisplayMode::AnimationBounce,
        ] {
            let _ = cycle.push(mode);
        }

        Self {
            cycle,
            show_sensor_ms: 3000,
            show_ip_ms: 3000,
            display_off_ms: 3000,
            spinner_ms: 3000,
            bounce_ms: 5000,
            entry_window_ms: 100,
            tick_ms: 50,
            spinner_frame_ms: 200,
            bounce_step_ms: 50,
        }
    }
}

impl ScheduleConfig {
    /// Dwell of one mode in milliseconds.
    pub fn dwell_ms(&self, mode: DisplayMode) -> u64 {
        match mode {
            DisplayMode::ShowSensor => self.show_sensor_ms,
            DisplayMode::ShowIp => self.show_ip_ms,
            DisplayMode::DisplayOff => self.display_off_ms,
            DisplayMode::AnimationSpinner => self.spinner_ms,
            DisplayMode::AnimationBounce => self.bounce_ms,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct WatchdogConfig {
    pub timeout_ms: u64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self { timeout_ms: 5000 }
    }
}

impl WatchdogConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct RecoveryConfig {
    pub restart_delay_ms: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            restart_delay_ms: 5000,
        }
    }
}

/// Bounded Wi-Fi association polling.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct AssociationConfig {
    pub max_polls: u32,
    pub poll_interval_ms: u32,
}

impl Default for AssociationConfig {
    fn default() -> Self {
        Self {
            max_polls: 50,
            poll_interval_ms: 100,
        }
    }
}

/// Linear transfer function of the analog temperature fallback.
///
/// The default describes an on-die sensor that reads 0.706 V at 27 °C and
/// falls by 1.721 mV per degree, sampled by a 16-bit converter.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct AnalogCalibration {
    pub samples: u8,
    pub sample_spacing_ms: u32,
    pub vref: f32,
    pub full_scale: f32,
    pub offset_volts: f32,
    pub slope_volts_per_celsius: f32,
    pub reference_celsius: f32,
}

impl Default for AnalogCalibration {
    fn default() -> Self {
        Self {
            samples: 5,
            sample_spacing_ms: 10,
            vref: 3.3,
            full_scale: 65535.0,
            offset_volts: 0.706,
            slope_volts_per_celsius: 0.001721,
            reference_celsius: 27.0,
        }
    }
}

impl AnalogCalibration {
    /// External TMP36: 0.75 V at 25 °C, rising 10 mV per degree.
    pub fn tmp36(vref: f32, full_scale: f32) -> Self {
        Self {
            vref,
            full_scale,
            offset_volts: 0.75,
            slope_volts_per_celsius: -0.010,
            reference_celsius: 25.0,
            ..Self::default()
        }
    }

    pub fn raw_to_volts(&self, raw: u16) -> f32 {
        raw as f32 * self.vref / self.full_scale
    }

    pub fn volts_to_celsius(&self, volts: f32) -> f32 {
        self.reference_celsius - (volts - self.offset_volts) / self.slope_volts_per_celsius
    }
}
