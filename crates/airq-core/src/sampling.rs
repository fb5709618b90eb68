//! Sampling facade
//!
//! One call reads the temperature source and the air-quality sensor and
//! returns an immutable [`SensorReading`]. The Celsius value is written to the
//! sensor's compensation input before any pollutant register is read.

use embedded_hal_async::delay::DelayNs;
use log::{debug, info};

use crate::metrics::{AqiRating, Eco2Rating, OperatingStatus};
use crate::sensors::{AirQualitySensor, AnalogInput, DigitalProbe, SensorError, TemperatureSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aqi {
    pub value: u8,
    pub rating: AqiRating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eco2 {
    pub value: u16,
    pub rating: Eco2Rating,
}

/// One complete snapshot of the sensor and the temperature probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub aqi: Aqi,
    pub tvoc_ppb: u16,
    pub eco2: Eco2,
    pub status: OperatingStatus,
    pub temperature_f: f32,
}

pub fn celsius_to_fahrenheit(celsius: f32) -> f32 {
    celsius * 9.0 / 5.0 + 32.0
}

/// Read every value once. Errors are returned as-is, there are no retries.
pub async fn sample<S, P, A, D>(
    sensor: &mut S,
    temperature: &mut TemperatureSource<P, A>,
    delay: &mut D,
) -> Result<SensorReading, SensorError>
where
    S: AirQualitySensor,
    P: DigitalProbe,
    A: AnalogInput,
    D: DelayNs,
{
    let celsius = temperature.read_celsius(delay).await?;
    debug!("Compensating with {} C ({})", celsius, temperature.kind().label());
    sensor.set_compensation_temperature(celsius).await?;

    let aqi = sensor.read_aqi().await?;
    let tvoc_ppb = sensor.read_tvoc().await?;
    let eco2 = sensor.read_eco2().await?;
    let status = sensor.read_status().await?;

    Ok(SensorReading {
        aqi: Aqi {
            value: aqi,
            rating: AqiRating::assess(aqi),
        },
        tvoc_ppb,
        eco2: Eco2 {
            value: eco2,
            rating: Eco2Rating::assess(eco2),
        },
        status,
        temperature_f: celsius_to_fahrenheit(celsius),
    })
}

/// Mirror a reading to the log, one line per value.
pub fn log_reading(reading: &SensorReading) {
    info!(
        "   AQI: {} [{}]",
        reading.aqi.value,
        reading.aqi.rating.label()
    );
    info!("  TVOC: {} ppb", reading.tvoc_ppb);
    info!(
        "  eCO2: {} ppm [{}]",
        reading.eco2.value,
        reading.eco2.rating.label()
    );
    info!("Status: {}", reading.status.label());
    info!("  Temp: {:.1} F", reading.temperature_f);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalogCalibration;
    use crate::testing::{FakeAdc, FakeProbe, FakeSensor, SensorCall, SimClock};
    use embassy_futures::block_on;

    #[test]
    fn fahrenheit_conversion() {
        assert_eq!(celsius_to_fahrenheit(0.0), 32.0);
        assert_eq!(celsius_to_fahrenheit(100.0), 212.0);
        assert!((celsius_to_fahrenheit(27.0) - 80.6).abs() < 1e-4);
    }

    #[test]
    fn sample_builds_reading_from_sensor_and_probe() {
        let clock = SimClock::new();
        let mut delay = clock.delay();
        let mut sensor = FakeSensor::new(2, 120, 450);
        let mut source = block_on(TemperatureSource::select(
            FakeProbe::present(0.0),
            FakeAdc::constant(0),
            AnalogCalibration::default(),
        ));

        let reading = block_on(sample(&mut sensor, &mut source, &mut delay)).unwrap();

        assert_eq!(reading.aqi.value, 2);
        assert_eq!(reading.aqi.rating, AqiRating::Good);
        assert_eq!(reading.tvoc_ppb, 120);
        assert_eq!(reading.eco2.value, 450);
        assert_eq!(reading.eco2.rating, Eco2Rating::Excellent);
        assert_eq!(reading.status, OperatingStatus::Normal);
        assert_eq!(reading.temperature_f, 32.0);
    }

    #[test]
    fn compensation_precedes_pollutant_reads() {
        let clock = SimClock::new();
        let mut delay = clock.delay();
        let mut sensor = FakeSensor::new(1, 0, 400);
        let mut source = block_on(TemperatureSource::select(
            FakeProbe::present(22.0),
            FakeAdc::constant(0),
            AnalogCalibration::default(),
        ));

        block_on(sample(&mut sensor, &mut source, &mut delay)).unwrap();

        let calls = sensor.calls();
        assert_eq!(calls[0], SensorCall::Compensate(22.0));
        assert!(
            calls[1..]
                .iter()
                .all(|call| !matches!(call, SensorCall::Compensate(_)))
        );
        assert_eq!(calls.len(), 5);
    }

    #[test]
    fn sensor_failure_propagates_without_retry() {
        let clock = SimClock::new();
        let mut delay = clock.delay();
        let mut sensor = FakeSensor::new(1, 0, 400);
        sensor.fail_reads();
        let mut source = block_on(TemperatureSource::select(
            FakeProbe::present(22.0),
            FakeAdc::constant(0),
            AnalogCalibration::default(),
        ));

        assert!(block_on(sample(&mut sensor, &mut source, &mut delay)).is_err());
        assert_eq!(
            sensor
                .calls()
                .iter()
                .filter(|call| matches!(call, SensorCall::ReadAqi))
                .count(),
            1
        );
    }
}
