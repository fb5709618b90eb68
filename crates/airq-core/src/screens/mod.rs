//! Screens drawn on the 128x64 monochrome panel
//!
//! Every screen is a set of free functions drawing into any
//! `DrawTarget<Color = BinaryColor>`. The [`Panel`] trait adds the hardware
//! operations (power, contrast, flush) the controller needs on top of that.

pub mod network;
pub mod sensor;
pub mod status;

use embedded_graphics::Drawable;
use embedded_graphics::mono_font::{MonoTextStyle, ascii::FONT_6X10};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_graphics::text::{Baseline, Text};
use thiserror_no_std::Error;

pub const DISPLAY_WIDTH_PX: u32 = 128;
pub const DISPLAY_HEIGHT_PX: u32 = 64;

/// Glyph size of [`FONT_6X10`].
pub const CHAR_WIDTH_PX: u32 = 6;
pub const CHAR_HEIGHT_PX: u32 = 10;

/// Characters that fit on one line.
pub const LINE_CHARS: usize = (DISPLAY_WIDTH_PX / CHAR_WIDTH_PX) as usize;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayError {
    #[error("display bus error while trying to {operation}")]
    Bus { operation: &'static str },
    #[error("display power change failed")]
    Power,
    #[error("drawing into the frame buffer failed")]
    Draw,
}

/// The physical display: a buffered draw target plus hardware control.
///
/// Drawing only touches the buffer; nothing is visible until [`Panel::flush`].
pub trait Panel: DrawTarget<Color = BinaryColor> {
    fn power_on(&mut self) -> impl Future<Output = Result<(), DisplayError>>;
    fn power_off(&mut self) -> impl Future<Output = Result<(), DisplayError>>;
    fn set_contrast(&mut self, level: u8) -> impl Future<Output = Result<(), DisplayError>>;
    fn flush(&mut self) -> impl Future<Output = Result<(), DisplayError>>;
}

pub(crate) fn text_style() -> MonoTextStyle<'static, BinaryColor> {
    MonoTextStyle::new(&FONT_6X10, BinaryColor::On)
}

/// Draw `text` with its top-left corner at (`x`, `y`).
pub fn draw_text<D>(target: &mut D, text: &str, x: i32, y: i32) -> Result<(), DisplayError>
where
    D: DrawTarget<Color = BinaryColor>,
{
    Text::with_baseline(text, Point::new(x, y), text_style(), Baseline::Top)
        .draw(target)
        .map(|_| ())
        .map_err(|_| DisplayError::Draw)
}

/// Blank a rectangle, used to erase a value before redrawing it.
pub fn clear_area<D>(target: &mut D, x: i32, y: i32, width: u32, height: u32) -> Result<(), DisplayError>
where
    D: DrawTarget<Color = BinaryColor>,
{
    target
        .fill_solid(
            &Rectangle::new(Point::new(x, y), Size::new(width, height)),
            BinaryColor::Off,
        )
        .map_err(|_| DisplayError::Draw)
}

pub fn clear_screen<D>(target: &mut D) -> Result<(), DisplayError>
where
    D: DrawTarget<Color = BinaryColor>,
{
    target.clear(BinaryColor::Off).map_err(|_| DisplayError::Draw)
}
