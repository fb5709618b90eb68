//! ENS160 digital metal-oxide gas sensor
//!
//! Minimal register-level driver: part id check, operating mode, temperature
//! compensation input and the four data registers the firmware consumes.

use embedded_hal::i2c::Error as _;
use embedded_hal_async::i2c::I2c;
use log::{error, info};

use super::{AirQualitySensor, SensorError};
use crate::metrics::OperatingStatus;

/// Default I2C address (ADDR pin high).
pub const DEFAULT_ADDRESS: u8 = 0x53;
/// Alternate I2C address (ADDR pin low).
pub const ALTERNATE_ADDRESS: u8 = 0x52;

const PART_ID: u16 = 0x0160;

const REG_PART_ID: u8 = 0x00;
const REG_OPMODE: u8 = 0x10;
const REG_TEMP_IN: u8 = 0x13;
const REG_DATA_STATUS: u8 = 0x20;
const REG_DATA_AQI: u8 = 0x21;
const REG_DATA_TVOC: u8 = 0x22;
const REG_DATA_ECO2: u8 = 0x24;

const OPMODE_STANDARD: u8 = 0x02;

const SENSOR_NAME: &str = "ENS160";

/// Encode a Celsius temperature for the TEMP_IN register (Kelvin * 64).
pub fn encode_temperature(celsius: f32) -> u16 {
    let kelvin_64 = (celsius + 273.15) * 64.0;
    if kelvin_64 <= 0.0 {
        0
    } else if kelvin_64 >= u16::MAX as f32 {
        u16::MAX
    } else {
        kelvin_64 as u16
    }
}

pub struct Ens160<I> {
    i2c: I,
    address: u8,
}

impl<I: I2c> Ens160<I> {
    pub fn new(i2c: I) -> Self {
        Self::with_address(i2c, DEFAULT_ADDRESS)
    }

    pub fn with_address(i2c: I, address: u8) -> Self {
        Self { i2c, address }
    }

    pub fn release(self) -> I {
        self.i2c
    }

    async fn read_u8(&mut self, register: u8, operation: &'static str) -> Result<u8, SensorError> {
        let mut buf = [0_u8; 1];
        self.i2c
            .write_read(self.address, &[register], &mut buf)
            .await
            .map_err(|e| {
                error!("{} register 0x{:02X} read failed: {:?}", SENSOR_NAME, register, e.kind());
                SensorError::ReadFailed {
                    sensor: SENSOR_NAME,
                    operation,
                    details: "I2C communication error",
                }
            })?;
        Ok(buf[0])
    }

    async fn read_u16(
        &mut self,
        register: u8,
        operation: &'static str,
    ) -> Result<u16, SensorError> {
        let mut buf = [0_u8; 2];
        self.i2c
            .write_read(self.address, &[register], &mut buf)
            .await
            .map_err(|e| {
                error!("{} register 0x{:02X} read failed: {:?}", SENSOR_NAME, register, e.kind());
                SensorError::ReadFailed {
                    sensor: SENSOR_NAME,
                    operation,
                    details: "I2C communication error",
                }
            })?;
        Ok(u16::from_le_bytes(buf))
    }

    async fn write(&mut self, bytes: &[u8], operation: &'static str) -> Result<(), SensorError> {
        self.i2c.write(self.address, bytes).await.map_err(|e| {
            error!("{} write failed: {:?}", SENSOR_NAME, e.kind());
            SensorError::ReadFailed {
                sensor: SENSOR_NAME,
                operation,
                details: "I2C communication error",
            }
        })
    }
}

impl<I: I2c> AirQualitySensor for Ens160<I> {
    async fn initialize(&mut self) -> Result<(), SensorError> {
        let part_id = self
            .read_u16(REG_PART_ID, "read part id")
            .await
            .map_err(|_| SensorError::NotFound {
                sensor: SENSOR_NAME,
            })?;

        if part_id != PART_ID {
            error!("{} unexpected part id 0x{:04X}", SENSOR_NAME, part_id);
            return Err(SensorError::InitializationFailed {
                sensor: SENSOR_NAME,
                details: "unexpected part id, possible address conflict",
            });
        }

        self.write(&[REG_OPMODE, OPMODE_STANDARD], "enter standard mode")
            .await
            .map_err(|_| SensorError::InitializationFailed {
                sensor: SENSOR_NAME,
                details: "failed to enter standard operating mode",
            })?;

        info!("{} ready at 0x{:02X}", SENSOR_NAME, self.address);
        Ok(())
    }

    async fn set_compensation_temperature(&mut self, celsius: f32) -> Result<(), SensorError> {
        let [lo, hi] = encode_temperature(celsius).to_le_bytes();
        self.write(&[REG_TEMP_IN, lo, hi], "write compensation temperature")
            .await
    }

    async fn read_aqi(&mut self) -> Result<u8, SensorError> {
        Ok(self.read_u8(REG_DATA_AQI, "read AQI").await? & 0b111)
    }

    async fn read_tvoc(&mut self) -> Result<u16, SensorError> {
        self.read_u16(REG_DATA_TVOC, "read TVOC").await
    }

    async fn read_eco2(&mut self) -> Result<u16, SensorError> {
        self.read_u16(REG_DATA_ECO2, "read eCO2").await
    }

    async fn read_status(&mut self) -> Result<OperatingStatus, SensorError> {
        let status = self.read_u8(REG_DATA_STATUS, "read status").await?;
        Ok(OperatingStatus::from_validity_flag(status >> 2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRegisterBus;
    use embassy_futures::block_on;

    fn bus_with_part_id() -> FakeRegisterBus {
        let mut bus = FakeRegisterBus::new(DEFAULT_ADDRESS);
        bus.set(REG_PART_ID, &[0x60, 0x01]);
        bus
    }

    #[test]
    fn initialize_checks_part_id_and_sets_standard_mode() {
        let mut sensor = Ens160::new(bus_with_part_id());
        block_on(sensor.initialize()).unwrap();
        let bus = sensor.release();
        assert_eq!(bus.get(REG_OPMODE), OPMODE_STANDARD);
    }

    #[test]
    fn wrong_part_id_is_an_initialization_failure() {
        let mut bus = FakeRegisterBus::new(DEFAULT_ADDRESS);
        bus.set(REG_PART_ID, &[0x61, 0x01]);
        let mut sensor = Ens160::new(bus);
        assert!(matches!(
            block_on(sensor.initialize()),
            Err(SensorError::InitializationFailed { .. })
        ));
    }

    #[test]
    fn missing_device_is_not_found() {
        let mut sensor = Ens160::with_address(bus_with_part_id(), ALTERNATE_ADDRESS);
        assert!(matches!(
            block_on(sensor.initialize()),
            Err(SensorError::NotFound { .. })
        ));
    }

    #[test]
    fn compensation_is_written_as_kelvin_times_64() {
        let mut sensor = Ens160::new(bus_with_part_id());
        block_on(sensor.set_compensation_temperature(25.0)).unwrap();
        let bus = sensor.release();
        let written = u16::from_le_bytes([bus.get(REG_TEMP_IN), bus.get(REG_TEMP_IN + 1)]);
        assert_eq!(written, encode_temperature(25.0));
        assert_eq!(written, 19081);
    }

    #[test]
    fn data_registers_decode() {
        let mut bus = bus_with_part_id();
        bus.set(REG_DATA_STATUS, &[0b0000_0100]);
        bus.set(REG_DATA_AQI, &[0b1111_1010]);
        bus.set(REG_DATA_TVOC, &120_u16.to_le_bytes());
        bus.set(REG_DATA_ECO2, &450_u16.to_le_bytes());
        let mut sensor = Ens160::new(bus);

        assert_eq!(block_on(sensor.read_aqi()).unwrap(), 2);
        assert_eq!(block_on(sensor.read_tvoc()).unwrap(), 120);
        assert_eq!(block_on(sensor.read_eco2()).unwrap(), 450);
        assert_eq!(
            block_on(sensor.read_status()).unwrap(),
            OperatingStatus::WarmUp
        );
    }
}
