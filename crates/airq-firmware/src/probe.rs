//! DS18B20 probe on a bit-banged one-wire bus
//!
//! `one-wire-bus` and `ds18b20` are written against the blocking
//! embedded-hal 0.2 traits, so the GPIO and the busy-wait delay are adapted
//! here. One-wire slots are microsecond-timed and cannot yield to the
//! executor; only the 750 ms conversion wait is async, and that lives in the
//! core's temperature source.

use core::convert::Infallible;

use embedded_hal_02::blocking::delay::{DelayMs, DelayUs};
use embedded_hal_02::digital::v2::{InputPin, OutputPin};
use esp_hal::delay::Delay;
use esp_hal::gpio::{DriveMode, Flex, InputConfig, OutputConfig, Pull};
use log::{debug, info, warn};
use one_wire_bus::{Address, OneWire};

use airq_core::sensors::{DigitalProbe, ProbeRom, SensorError};

const SENSOR: &str = "DS18B20";

/// Open-drain GPIO with the internal pull-up, as the one-wire bus expects.
pub struct OneWirePin<'d> {
    pin: Flex<'d>,
}

impl<'d> OneWirePin<'d> {
    pub fn new(mut pin: Flex<'d>) -> Self {
        pin.apply_input_config(&InputConfig::default().with_pull(Pull::Up));
        pin.apply_output_config(
            &OutputConfig::default()
                .with_drive_mode(DriveMode::OpenDrain)
                .with_pull(Pull::Up),
        );
        pin.set_high();
        pin.set_input_enable(true);
        pin.set_output_enable(true);
        Self { pin }
    }
}

impl InputPin for OneWirePin<'_> {
    type Error = Infallible;

    fn is_high(&self) -> Result<bool, Self::Error> {
        Ok(self.pin.is_high())
    }

    fn is_low(&self) -> Result<bool, Self::Error> {
        Ok(self.pin.is_low())
    }
}

impl OutputPin for OneWirePin<'_> {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.pin.set_low();
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.pin.set_high();
        Ok(())
    }
}

/// Busy-wait delay for one-wire slot timing.
pub struct BusyDelay(Delay);

impl Default for BusyDelay {
    fn default() -> Self {
        Self(Delay::new())
    }
}

impl DelayUs<u16> for BusyDelay {
    fn delay_us(&mut self, us: u16) {
        self.0.delay_micros(us as u32);
    }
}

impl DelayMs<u16> for BusyDelay {
    fn delay_ms(&mut self, ms: u16) {
        self.0.delay_millis(ms as u32);
    }
}

pub struct Ds18b20Probe<'d> {
    bus: Option<OneWire<OneWirePin<'d>>>,
    delay: BusyDelay,
}

impl<'d> Ds18b20Probe<'d> {
    /// A bus held low at startup leaves the probe permanently absent, so the
    /// temperature falls back to the ADC.
    pub fn new(pin: OneWirePin<'d>) -> Self {
        let bus = OneWire::new(pin)
            .inspect_err(|e| warn!("One-wire bus unusable: {:?}", e))
            .ok();
        Self {
            bus,
            delay: BusyDelay::default(),
        }
    }
}

fn read_failed(operation: &'static str) -> SensorError {
    SensorError::ReadFailed {
        sensor: SENSOR,
        operation,
        details: "one-wire error",
    }
}

impl DigitalProbe for Ds18b20Probe<'_> {
    async fn discover(&mut self) -> Result<Option<ProbeRom>, SensorError> {
        let Some(bus) = self.bus.as_mut() else {
            return Ok(None);
        };
        let mut devices = 0u32;
        for found in bus.devices(false, &mut self.delay) {
            let address = found.map_err(|e| {
                warn!("One-wire search failed: {:?}", e);
                read_failed("search the bus")
            })?;
            devices += 1;
            if address.family_code() == ds18b20::FAMILY_CODE {
                info!("DS18B20 at {:?} ({} one-wire device(s) seen)", address, devices);
                return Ok(Some(ProbeRom(address.0.to_le_bytes())));
            }
            debug!("Skipping one-wire device {:?}", address);
        }
        Ok(None)
    }

    async fn start_conversion(&mut self) -> Result<(), SensorError> {
        let bus = self.bus.as_mut().ok_or(SensorError::NotFound { sensor: SENSOR })?;
        ds18b20::start_simultaneous_temp_measurement(bus, &mut self.delay).map_err(|e| {
            warn!("DS18B20 conversion start failed: {:?}", e);
            read_failed("start a conversion")
        })
    }

    async fn read_celsius(&mut self, rom: ProbeRom) -> Result<f32, SensorError> {
        let address = Address(u64::from_le_bytes(rom.0));
        let sensor = ds18b20::Ds18b20::new::<Infallible>(address).map_err(|_| {
            SensorError::InitializationFailed {
                sensor: SENSOR,
                details: "not a DS18B20 address",
            }
        })?;
        let bus = self.bus.as_mut().ok_or(SensorError::NotFound { sensor: SENSOR })?;
        let data = sensor
            .read_data(bus, &mut self.delay)
            .map_err(|e| {
                warn!("DS18B20 scratchpad read failed: {:?}", e);
                read_failed("read the scratchpad")
            })?;
        Ok(data.temperature)
    }
}
