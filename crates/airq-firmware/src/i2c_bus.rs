//! Shared async I2C bus
//!
//! The ENS160 and the SSD1306 sit on the same I2C controller. Each driver
//! gets its own [`SharedI2c`] handle; a transaction holds the embassy mutex
//! across its await points so transfers from the two drivers never interleave.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embedded_hal_async::i2c::{ErrorType, I2c, Operation};

pub type I2cBus<T> = Mutex<CriticalSectionRawMutex, T>;

/// One device's handle onto a shared bus.
pub struct SharedI2c<'a, T> {
    bus: &'a I2cBus<T>,
}

impl<'a, T> SharedI2c<'a, T> {
    #[inline]
    pub const fn new(bus: &'a I2cBus<T>) -> Self {
        Self { bus }
    }
}

impl<T> ErrorType for SharedI2c<'_, T>
where
    T: ErrorType,
{
    type Error = T::Error;
}

impl<T> I2c for SharedI2c<'_, T>
where
    T: I2c,
{
    #[inline]
    async fn read(&mut self, address: u8, read: &mut [u8]) -> Result<(), Self::Error> {
        let mut bus = self.bus.lock().await;
        bus.read(address, read).await
    }

    #[inline]
    async fn write(&mut self, address: u8, write: &[u8]) -> Result<(), Self::Error> {
        let mut bus = self.bus.lock().await;
        bus.write(address, write).await
    }

    /// Register reads go through here; the repeated start must not be split
    /// by the other device.
    #[inline]
    async fn write_read(
        &mut self,
        address: u8,
        write: &[u8],
        read: &mut [u8],
    ) -> Result<(), Self::Error> {
        let mut bus = self.bus.lock().await;
        bus.write_read(address, write, read).await
    }

    #[inline]
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut bus = self.bus.lock().await;
        bus.transaction(address, operations).await
    }
}
