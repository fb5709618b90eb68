//! Board wiring and bus construction
//!
//! | Function          | GPIO |
//! |-------------------|------|
//! | I2C SDA (OLED, ENS160) | 8 |
//! | I2C SCL (OLED, ENS160) | 9 |
//! | One-wire (DS18B20)     | 4 |
//! | TMP36 output           | 1 |

use esp_hal::Async;
use esp_hal::i2c::master::{Config as I2cConfig, ConfigError, I2c};
use esp_hal::peripherals::{GPIO8, GPIO9, I2C0};
use esp_hal::time::Rate;
use log::info;
use static_cell::StaticCell;

use crate::i2c_bus::{I2cBus, SharedI2c};

pub type AsyncI2c = I2c<'static, Async>;
pub type SharedBus = SharedI2c<'static, AsyncI2c>;

/// One handle per device on the I2C bus.
pub struct I2cDevices {
    pub display: SharedBus,
    pub sensor: SharedBus,
}

/// Configure I2C0 at 400 kHz and split it between the OLED and the ENS160.
pub fn create_i2c_bus(
    i2c0: I2C0<'static>,
    sda: GPIO8<'static>,
    scl: GPIO9<'static>,
) -> Result<I2cDevices, ConfigError> {
    static I2C0_BUS: StaticCell<I2cBus<AsyncI2c>> = StaticCell::new();

    let i2c = I2c::new(i2c0, I2cConfig::default().with_frequency(Rate::from_khz(400)))?
        .with_sda(sda)
        .with_scl(scl)
        .into_async();
    let bus = I2C0_BUS.init(I2cBus::new(i2c));
    info!("I2C0 ready at 400 kHz (SDA GPIO8, SCL GPIO9)");

    Ok(I2cDevices {
        display: SharedI2c::new(bus),
        sensor: SharedI2c::new(bus),
    })
}
