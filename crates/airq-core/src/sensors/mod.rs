//! Sensor traits, errors and the temperature source chosen at boot

mod analog;
pub mod ens160;

pub use analog::{AnalogInput, AnalogThermometer};
pub use ens160::Ens160;

use core::fmt;

use embassy_time::Duration;
use embedded_hal_async::delay::DelayNs;
use log::{info, warn};
use thiserror_no_std::Error;

use crate::config::AnalogCalibration;
use crate::metrics::OperatingStatus;

/// Worst-case DS18B20 conversion time at 12-bit resolution.
pub const PROBE_CONVERSION_TIME: Duration = Duration::from_millis(750);

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("{sensor}: failed to {operation} ({details})")]
    ReadFailed {
        sensor: &'static str,
        operation: &'static str,
        details: &'static str,
    },
    #[error("{sensor}: initialization failed ({details})")]
    InitializationFailed {
        sensor: &'static str,
        details: &'static str,
    },
    #[error("{sensor}: not found on the bus")]
    NotFound { sensor: &'static str },
    #[error("{sensor}: timed out while trying to {operation}")]
    Timeout {
        sensor: &'static str,
        operation: &'static str,
    },
}

/// Capability contract of the air-quality sensor.
///
/// The compensation temperature must be written before the pollutant values
/// are read; [`crate::sampling::sample`] enforces that order.
pub trait AirQualitySensor {
    /// Bring the sensor into its measuring mode. Called once during boot.
    fn initialize(&mut self) -> impl Future<Output = Result<(), SensorError>>;

    /// Feed the ambient temperature used for pollutant compensation.
    fn set_compensation_temperature(
        &mut self,
        celsius: f32,
    ) -> impl Future<Output = Result<(), SensorError>>;

    /// UBA air quality index, 1..=5.
    fn read_aqi(&mut self) -> impl Future<Output = Result<u8, SensorError>>;

    /// Total volatile organic compounds in ppb.
    fn read_tvoc(&mut self) -> impl Future<Output = Result<u16, SensorError>>;

    /// Equivalent CO2 in ppm.
    fn read_eco2(&mut self) -> impl Future<Output = Result<u16, SensorError>>;

    fn read_status(&mut self) -> impl Future<Output = Result<OperatingStatus, SensorError>>;
}

/// 64-bit ROM code of a one-wire temperature probe.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ProbeRom(pub [u8; 8]);

impl fmt::Debug for ProbeRom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

/// Dedicated digital temperature probe (DS18B20 or compatible).
pub trait DigitalProbe {
    /// Scan the bus and return the ROM of the first probe found.
    fn discover(&mut self) -> impl Future<Output = Result<Option<ProbeRom>, SensorError>>;

    /// Start a temperature conversion on every probe on the bus.
    fn start_conversion(&mut self) -> impl Future<Output = Result<(), SensorError>>;

    /// Read the last converted temperature of one probe.
    fn read_celsius(&mut self, rom: ProbeRom) -> impl Future<Output = Result<f32, SensorError>>;

    /// Time to wait between starting a conversion and reading it.
    fn conversion_time(&self) -> Duration {
        PROBE_CONVERSION_TIME
    }
}

/// Which physical path the temperature comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Digital,
    Analog,
}

impl SourceKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Digital => "DS18B20",
            Self::Analog => "ADC",
        }
    }
}

/// Temperature source selected once at startup.
///
/// There is no way to switch variants after construction, so a run never
/// oscillates between the probe and the analog fallback.
pub enum TemperatureSource<P, A> {
    Digital { probe: P, rom: ProbeRom },
    Analog(AnalogThermometer<A>),
}

impl<P, A> TemperatureSource<P, A>
where
    P: DigitalProbe,
    A: AnalogInput,
{
    /// Prefer the digital probe; fall back to the analog path if no probe
    /// ROM is found or the bus scan fails.
    pub async fn select(mut probe: P, analog: A, calibration: AnalogCalibration) -> Self {
        match probe.discover().await {
            Ok(Some(rom)) => {
                info!("Temperature probe found: {:?}", rom);
                Self::Digital { probe, rom }
            }
            Ok(None) => {
                warn!("No temperature probe found, using analog fallback");
                Self::Analog(AnalogThermometer::new(analog, calibration))
            }
            Err(e) => {
                warn!("Probe scan failed ({}), using analog fallback", e);
                Self::Analog(AnalogThermometer::new(analog, calibration))
            }
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Digital { .. } => SourceKind::Digital,
            Self::Analog(_) => SourceKind::Analog,
        }
    }

    /// Read the current temperature in degrees Celsius.
    pub async fn read_celsius<D: DelayNs>(&mut self, delay: &mut D) -> Result<f32, SensorError> {
        match self {
            Self::Digital { probe, rom } => {
                probe.start_conversion().await?;
                delay
                    .delay_ms(probe.conversion_time().as_millis() as u32)
                    .await;
                probe.read_celsius(*rom).await
            }
            Self::Analog(thermometer) => thermometer.read_celsius(delay).await,
        }
    }
}
