//! SSD1306 128x64 OLED behind the [`Panel`] trait
//!
//! The driver keeps its own frame buffer (buffered graphics mode), so drawing
//! never touches the bus and [`Panel::flush`] pushes the changed region.

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_hal_async::i2c::I2c;
use log::{debug, info};
use ssd1306::mode::BufferedGraphicsModeAsync;
use ssd1306::prelude::{Brightness, DisplayRotation, DisplaySize128x64, I2CInterface};
use ssd1306::{I2CDisplayInterface, Ssd1306Async};

use airq_core::screens::{DisplayError, Panel};

/// Pre-charge period used with every contrast level.
const PRECHARGE: u8 = 2;

type Driver<I> =
    Ssd1306Async<I2CInterface<I>, DisplaySize128x64, BufferedGraphicsModeAsync<DisplaySize128x64>>;

pub struct OledPanel<I> {
    display: Driver<I>,
    initialized: bool,
}

impl<I: I2c> OledPanel<I> {
    pub fn new(i2c: I) -> Self {
        let interface = I2CDisplayInterface::new(i2c);
        let display = Ssd1306Async::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();
        Self {
            display,
            initialized: false,
        }
    }

    /// Run the controller's init sequence once, on first power-up.
    async fn ensure_initialized(&mut self) -> Result<(), DisplayError> {
        if self.initialized {
            return Ok(());
        }
        self.display
            .init()
            .await
            .map_err(|_| DisplayError::Bus { operation: "init" })?;
        self.initialized = true;
        info!("SSD1306 initialized");
        Ok(())
    }
}

impl<I> OriginDimensions for OledPanel<I> {
    fn size(&self) -> Size {
        self.display.size()
    }
}

impl<I: I2c> DrawTarget for OledPanel<I> {
    type Color = BinaryColor;
    type Error = DisplayError;

    fn draw_iter<It>(&mut self, pixels: It) -> Result<(), Self::Error>
    where
        It: IntoIterator<Item = Pixel<Self::Color>>,
    {
        self.display
            .draw_iter(pixels)
            .map_err(|_| DisplayError::Draw)
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        self.display
            .fill_solid(area, color)
            .map_err(|_| DisplayError::Draw)
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.display.clear(color).map_err(|_| DisplayError::Draw)
    }
}

impl<I: I2c> Panel for OledPanel<I> {
    async fn power_on(&mut self) -> Result<(), DisplayError> {
        self.ensure_initialized().await?;
        self.display
            .set_display_on(true)
            .await
            .map_err(|_| DisplayError::Power)
    }

    async fn power_off(&mut self) -> Result<(), DisplayError> {
        self.display
            .set_display_on(false)
            .await
            .map_err(|_| DisplayError::Power)
    }

    async fn set_contrast(&mut self, level: u8) -> Result<(), DisplayError> {
        debug!("Display contrast {:#04X}", level);
        self.display
            .set_brightness(Brightness::custom(PRECHARGE, level))
            .await
            .map_err(|_| DisplayError::Bus {
                operation: "set contrast",
            })
    }

    async fn flush(&mut self) -> Result<(), DisplayError> {
        self.display
            .flush()
            .await
            .map_err(|_| DisplayError::Bus { operation: "flush" })
    }
}
