//! Network address view

use core::fmt::Write;
use core::net::Ipv4Addr;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use heapless::String;

use super::{DisplayError, draw_text};

pub const TITLE_Y: i32 = 16;
pub const ADDRESS_Y: i32 = 32;

/// Title plus the dotted-quad address, or "no network" before association.
pub fn draw<D>(target: &mut D, address: Option<Ipv4Addr>) -> Result<(), DisplayError>
where
    D: DrawTarget<Color = BinaryColor>,
{
    draw_text(target, "IP address", 0, TITLE_Y)?;
    match address {
        Some(ip) => {
            // "255.255.255.255" is the longest possible form
            let mut text: String<16> = String::new();
            let _ = write!(text, "{}", ip);
            draw_text(target, &text, 0, ADDRESS_Y)
        }
        None => draw_text(target, "no network", 0, ADDRESS_Y),
    }
}
