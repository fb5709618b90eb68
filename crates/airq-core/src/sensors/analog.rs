//! Analog temperature fallback
//!
//! Used when no digital probe answers at boot. The raw ADC value is averaged,
//! converted to volts and then to Celsius with the linear transfer function
//! of the on-board sensor.

use embassy_time::Duration;
use embedded_hal_async::delay::DelayNs;

use super::SensorError;
use crate::config::AnalogCalibration;

/// A single 16-bit ADC channel.
pub trait AnalogInput {
    fn read_raw(&mut self) -> Result<u16, SensorError>;
}

pub struct AnalogThermometer<A> {
    input: A,
    calibration: AnalogCalibration,
}

impl<A: AnalogInput> AnalogThermometer<A> {
    pub fn new(input: A, calibration: AnalogCalibration) -> Self {
        Self { input, calibration }
    }

    /// Total time spent waiting between samples for one reading.
    pub fn sampling_time(&self) -> Duration {
        Duration::from_millis(
            self.calibration.samples as u64 * self.calibration.sample_spacing_ms as u64,
        )
    }

    /// Average `samples` conversions and return degrees Celsius.
    pub async fn read_celsius<D: DelayNs>(&mut self, delay: &mut D) -> Result<f32, SensorError> {
        let samples = self.calibration.samples.max(1);
        let mut sum_volts = 0.0_f32;

        for _ in 0..samples {
            let raw = self.input.read_raw()?;
            sum_volts += self.calibration.raw_to_volts(raw);
            delay.delay_ms(self.calibration.sample_spacing_ms).await;
        }

        Ok(self.calibration.volts_to_celsius(sum_volts / samples as f32))
    }
}
