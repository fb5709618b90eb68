//! TMP36 analog temperature sensor on GPIO1 (ADC1)
//!
//! The ESP32-S3 has no on-die sensor routed to a GPIO, so the fallback reads
//! an external TMP36 whose output pin is wired to GPIO1.

use esp_hal::Blocking;
use esp_hal::analog::adc::{Adc, AdcConfig, AdcPin, Attenuation};
use esp_hal::peripherals::{ADC1, GPIO1};

use airq_core::config::AnalogCalibration;
use airq_core::sensors::{AnalogInput, SensorError};

/// Conversion polls before a one-shot read counts as timed out.
const MAX_POLLS: u32 = 1_000;

/// Full-scale count of the 12-bit SAR ADC.
pub const ADC_FULL_SCALE: f32 = 4095.0;

/// Input voltage at full scale with 11 dB attenuation.
pub const ADC_FULL_SCALE_VOLTS: f32 = 3.1;

pub struct AdcTemperatureInput<'d> {
    adc: Adc<'d, ADC1<'d>, Blocking>,
    pin: AdcPin<GPIO1<'d>, ADC1<'d>>,
}

impl<'d> AdcTemperatureInput<'d> {
    pub fn new(adc1: ADC1<'d>, gpio: GPIO1<'d>) -> Self {
        let mut config = AdcConfig::new();
        let pin = config.enable_pin(gpio, Attenuation::_11dB);
        Self {
            adc: Adc::new(adc1, config),
            pin,
        }
    }
}

/// TMP36 transfer function over this ADC's range, keeping the sampling
/// cadence of `base`.
pub fn calibration(base: AnalogCalibration) -> AnalogCalibration {
    AnalogCalibration {
        samples: base.samples,
        sample_spacing_ms: base.sample_spacing_ms,
        ..AnalogCalibration::tmp36(ADC_FULL_SCALE_VOLTS, ADC_FULL_SCALE)
    }
}

impl AnalogInput for AdcTemperatureInput<'_> {
    fn read_raw(&mut self) -> Result<u16, SensorError> {
        for _ in 0..MAX_POLLS {
            if let Ok(raw) = self.adc.read_oneshot(&mut self.pin) {
                return Ok(raw);
            }
        }
        Err(SensorError::Timeout {
            sensor: "ADC",
            operation: "convert",
        })
    }
}
