//! Live sensor view
//!
//! Fixed layout: status line on top, four labelled rows below with the values
//! right of the labels. Values are erased with a blank cell before each
//! redraw so shorter numbers do not leave stale digits behind.

use core::fmt::Write;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use heapless::String;

use super::{CHAR_HEIGHT_PX, DisplayError, clear_area, draw_text};
use crate::sampling::SensorReading;

pub const STATUS_Y: i32 = 8;
pub const AQI_Y: i32 = 20;
pub const TVOC_Y: i32 = 30;
pub const ECO2_Y: i32 = 40;
pub const TEMP_Y: i32 = 50;

pub const VALUE_X: i32 = 65;
pub const UNIT_X: i32 = 105;

/// Width of the blank cell erased under each value.
pub const VALUE_CELL_WIDTH_PX: u32 = 32;
const STATUS_CELL_WIDTH_PX: u32 = 100;

const AQI_LABEL: &str = "   AQI:";
const TVOC_LABEL: &str = "  TVOC:";
const ECO2_LABEL: &str = "  eCO2:";
const TEMP_LABEL: &str = "  Temp:";
const TEMP_UNIT: &str = "*F";

/// Labels and units that never change while the screen is shown.
pub fn draw_template<D>(target: &mut D) -> Result<(), DisplayError>
where
    D: DrawTarget<Color = BinaryColor>,
{
    draw_text(target, AQI_LABEL, 0, AQI_Y)?;
    draw_text(target, TVOC_LABEL, 0, TVOC_Y)?;
    draw_text(target, ECO2_LABEL, 0, ECO2_Y)?;
    draw_text(target, TEMP_LABEL, 0, TEMP_Y)?;
    draw_text(target, TEMP_UNIT, UNIT_X, TEMP_Y)
}

fn draw_value<D>(target: &mut D, y: i32, value: &str) -> Result<(), DisplayError>
where
    D: DrawTarget<Color = BinaryColor>,
{
    clear_area(target, VALUE_X, y, VALUE_CELL_WIDTH_PX, CHAR_HEIGHT_PX)?;
    draw_text(target, value, VALUE_X, y)
}

/// Status line and the four values of `reading`.
pub fn draw_values<D>(target: &mut D, reading: &SensorReading) -> Result<(), DisplayError>
where
    D: DrawTarget<Color = BinaryColor>,
{
    clear_area(target, 0, STATUS_Y, STATUS_CELL_WIDTH_PX, CHAR_HEIGHT_PX)?;
    draw_text(target, reading.status.label(), 0, STATUS_Y)?;

    let mut text: String<8> = String::new();

    let _ = write!(text, "{}", reading.aqi.value);
    draw_value(target, AQI_Y, &text)?;

    text.clear();
    let _ = write!(text, "{}", reading.tvoc_ppb);
    draw_value(target, TVOC_Y, &text)?;

    text.clear();
    let _ = write!(text, "{}", reading.eco2.value);
    draw_value(target, ECO2_Y, &text)?;

    text.clear();
    let _ = write!(text, "{:.1}", reading.temperature_f);
    draw_value(target, TEMP_Y, &text)
}
