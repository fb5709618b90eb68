//! Boot progress and fatal error views

use core::fmt::{self, Write};

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use heapless::{String, Vec};

use super::{CHAR_HEIGHT_PX, DisplayError, LINE_CHARS, clear_screen, draw_text};
use crate::app_state::{AppError, Subsystem};

/// Lines that fit below the title.
pub const MAX_STATUS_LINES: usize = 5;

const TITLE_Y: i32 = 0;
const FIRST_LINE_Y: i32 = 12;

/// Room for a full line of four-byte characters.
const LINE_BYTES: usize = LINE_CHARS * 4;

/// Outcome of bringing up one subsystem, as listed on the boot screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusLine {
    pub subsystem: Subsystem,
    pub outcome: &'static str,
}

fn line_y(index: usize) -> i32 {
    FIRST_LINE_Y + (index as i32) * CHAR_HEIGHT_PX as i32
}

/// Redraw the whole boot screen. Lines past [`MAX_STATUS_LINES`] are dropped.
pub fn draw_boot<D>(target: &mut D, lines: &[StatusLine]) -> Result<(), DisplayError>
where
    D: DrawTarget<Color = BinaryColor>,
{
    clear_screen(target)?;
    draw_text(target, "Starting...", 0, TITLE_Y)?;
    for (index, line) in lines.iter().take(MAX_STATUS_LINES).enumerate() {
        let mut text: String<LINE_CHARS> = String::new();
        let _ = write!(text, "{} {}", line.subsystem.label(), line.outcome);
        draw_text(target, &text, 0, line_y(index))?;
    }
    Ok(())
}

/// Formatted text broken into lines of at most [`LINE_CHARS`] characters.
/// Whatever follows the last line is dropped, the full text is in the log.
#[derive(Default)]
struct Wrapped {
    lines: Vec<String<LINE_BYTES>, MAX_STATUS_LINES>,
}

impl Write for Wrapped {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            let full = self
                .lines
                .last()
                .is_none_or(|line| line.chars().count() >= LINE_CHARS);
            if full && self.lines.push(String::new()).is_err() {
                break;
            }
            if let Some(line) = self.lines.last_mut() {
                let _ = line.push(c);
            }
        }
        Ok(())
    }
}

/// Error text wrapped to the panel width under a fixed heading.
pub fn draw_fatal<D>(target: &mut D, error: &AppError) -> Result<(), DisplayError>
where
    D: DrawTarget<Color = BinaryColor>,
{
    clear_screen(target)?;
    draw_text(target, "FATAL", 0, TITLE_Y)?;

    let mut message = Wrapped::default();
    let _ = write!(message, "{}", error);

    for (index, line) in message.lines.iter().enumerate() {
        draw_text(target, line, 0, line_y(index))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framebuffer::FrameBuffer;
    use crate::screens::DISPLAY_WIDTH_PX;
    use crate::sensors::SensorError;
    use embedded_graphics::primitives::Rectangle;

    fn row_lit(fb: &FrameBuffer, index: usize) -> usize {
        fb.lit_in(&Rectangle::new(
            Point::new(0, line_y(index)),
            Size::new(DISPLAY_WIDTH_PX, CHAR_HEIGHT_PX),
        ))
    }

    #[test]
    fn boot_lines_stack_downwards() {
        let mut fb = FrameBuffer::new();
        let lines = [
            StatusLine {
                subsystem: Subsystem::Display,
                outcome: "OK",
            },
            StatusLine {
                subsystem: Subsystem::Sensor,
                outcome: "OK",
            },
        ];
        draw_boot(&mut fb, &lines).unwrap();

        assert!(row_lit(&fb, 0) > 0);
        assert!(row_lit(&fb, 1) > 0);
        assert_eq!(row_lit(&fb, 2), 0);
    }

    #[test]
    fn long_fatal_message_wraps() {
        let mut fb = FrameBuffer::new();
        let error = AppError::Sensor(SensorError::ReadFailed {
            sensor: "ENS160",
            operation: "read AQI",
            details: "I2C bus error",
        });
        draw_fatal(&mut fb, &error).unwrap();

        assert!(row_lit(&fb, 0) > 0);
        assert!(row_lit(&fb, 1) > 0);
    }

    #[test]
    fn wrapping_cuts_on_char_boundaries() {
        let mut text = Wrapped::default();
        write!(text, "{}", "é".repeat(30)).unwrap();

        assert_eq!(text.lines.len(), 2);
        assert_eq!(text.lines[0].chars().count(), LINE_CHARS);
        assert_eq!(text.lines[1].as_str(), "é".repeat(9));
    }

    #[test]
    fn overflowing_fragment_is_truncated_not_dropped() {
        let mut text = Wrapped::default();
        write!(text, "{}{}", "a".repeat(100), "b".repeat(50)).unwrap();

        assert_eq!(text.lines.len(), MAX_STATUS_LINES);
        // 100 a's fill four lines and 16 columns of the fifth; b's take the rest.
        assert_eq!(text.lines[4].as_str(), "aaaaaaaaaaaaaaaabbbbb");
    }

    #[test]
    fn fatal_error_fills_every_line_it_needs() {
        let mut fb = FrameBuffer::new();
        let error = AppError::Sensor(SensorError::ReadFailed {
            sensor: "ENS160",
            operation: "read eCO₂ after a bus reset",
            details: "arbitration lost on SDA while the bus was busy",
        });
        draw_fatal(&mut fb, &error).unwrap();

        for index in 0..MAX_STATUS_LINES {
            assert!(row_lit(&fb, index) > 0, "line {} is blank", index);
        }
    }
}
