//! ESP32-S3 drivers for the air-quality display firmware
//!
//! Implements the `airq-core` hardware traits on real peripherals: the
//! SSD1306 panel and ENS160 on a shared I2C bus, a DS18B20 on one-wire, the
//! ADC fallback thermometer, Wi-Fi through esp-radio, MQTT through
//! rust-mqtt and the RTC watchdog.

#![no_std]

extern crate alloc;

pub mod adc;
pub mod clock;
pub mod hardware;
pub mod i2c_bus;
pub mod mqtt;
pub mod panel;
pub mod probe;
pub mod watchdog;
pub mod wifi;

use airq_core::config::{Config, InternetConfig, MqttConfig};

/// Wi-Fi credentials and broker address baked in by `build.rs`.
pub const WIFI_SSID: &str = env!("WIFI_SSID");
pub const WIFI_PASSWORD: &str = env!("WIFI_PASSWORD");
pub const MQTT_BROKER: &str = env!("MQTT_BROKER");

/// Device configuration: core defaults plus the build-time network settings.
pub fn firmware_config() -> Config<'static> {
    let defaults = Config::default();
    Config {
        internet: InternetConfig {
            ssid: WIFI_SSID,
            password: WIFI_PASSWORD,
        },
        mqtt: MqttConfig {
            broker: MQTT_BROKER,
            ..defaults.mqtt
        },
        analog: adc::calibration(defaults.analog),
        ..defaults
    }
}
