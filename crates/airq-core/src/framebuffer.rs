//! Monochrome framebuffer with change tracking.
//!
//! Host-side stand-in for the panel's own buffer: screens draw into it and
//! only the rectangle containing changed pixels is copied to the real target
//! on flush. The simulator and the tests both render through it.

extern crate alloc;

use alloc::vec;
use alloc::vec::Vec;
use core::convert::Infallible;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use log::debug;

use crate::screens::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX};

const PIXEL_COUNT: usize = DISPLAY_WIDTH_PX as usize * DISPLAY_HEIGHT_PX as usize;

/// Bounding box of pixels that have changed since the last flush.
#[derive(Debug, Clone, Copy)]
struct DirtyRect {
    min_x: usize,
    min_y: usize,
    max_x: usize,
    max_y: usize,
}

impl DirtyRect {
    fn expand(&mut self, x: usize, y: usize) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    fn from_point(x: usize, y: usize) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }
}

/// 128x64 `BinaryColor` framebuffer.
pub struct FrameBuffer {
    pixels: Vec<BinaryColor>,
    dirty: Option<DirtyRect>,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuffer {
    /// Allocate a framebuffer with every pixel off.
    pub fn new() -> Self {
        Self {
            pixels: vec![BinaryColor::Off; PIXEL_COUNT],
            dirty: None,
        }
    }

    #[inline]
    fn set_pixel(&mut self, x: usize, y: usize, color: BinaryColor) {
        let idx = y * DISPLAY_WIDTH_PX as usize + x;
        if self.pixels[idx] != color {
            self.pixels[idx] = color;
            match &mut self.dirty {
                Some(rect) => rect.expand(x, y),
                None => self.dirty = Some(DirtyRect::from_point(x, y)),
            }
        }
    }

    /// Color at a coordinate; off for anything outside the panel.
    pub fn pixel(&self, x: i32, y: i32) -> BinaryColor {
        if x < 0 || y < 0 || x >= DISPLAY_WIDTH_PX as i32 || y >= DISPLAY_HEIGHT_PX as i32 {
            return BinaryColor::Off;
        }
        self.pixels[y as usize * DISPLAY_WIDTH_PX as usize + x as usize]
    }

    /// Number of lit pixels inside `area`.
    pub fn lit_in(&self, area: &Rectangle) -> usize {
        area.points()
            .filter(|p| self.pixel(p.x, p.y) == BinaryColor::On)
            .count()
    }

    pub fn lit_pixels(&self) -> usize {
        self.pixels
            .iter()
            .filter(|color| **color == BinaryColor::On)
            .count()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.is_some()
    }

    /// Copy the dirty region to another draw target, then reset the dirty state.
    pub fn flush<D>(&mut self, display: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        let Some(rect) = self.dirty.take() else {
            return Ok(());
        };

        let width = rect.max_x - rect.min_x + 1;
        let height = rect.max_y - rect.min_y + 1;

        debug!(
            "Flushing {}x{} dirty region at ({}, {})",
            width, height, rect.min_x, rect.min_y
        );

        let area = Rectangle::new(
            Point::new(rect.min_x as i32, rect.min_y as i32),
            Size::new(width as u32, height as u32),
        );

        let pixels = &self.pixels;
        let stride = DISPLAY_WIDTH_PX as usize;
        let pixel_iter = (rect.min_y..=rect.max_y).flat_map(move |y| {
            let row_start = y * stride + rect.min_x;
            pixels[row_start..row_start + width].iter().copied()
        });

        display.fill_contiguous(&area, pixel_iter)
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        Size::new(DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX)
    }
}

impl DrawTarget for FrameBuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let w = DISPLAY_WIDTH_PX as usize;
        let h = DISPLAY_HEIGHT_PX as usize;

        for Pixel(coord, color) in pixels {
            if coord.x >= 0 && coord.y >= 0 && (coord.x as usize) < w && (coord.y as usize) < h {
                self.set_pixel(coord.x as usize, coord.y as usize, color);
            }
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let w = DISPLAY_WIDTH_PX as usize;
        let h = DISPLAY_HEIGHT_PX as usize;

        let x_start = area.top_left.x.clamp(0, w as i32) as usize;
        let y_start = area.top_left.y.clamp(0, h as i32) as usize;
        let x_end = area
            .top_left
            .x
            .saturating_add(area.size.width as i32)
            .clamp(0, w as i32) as usize;
        let y_end = area
            .top_left
            .y
            .saturating_add(area.size.height as i32)
            .clamp(0, h as i32) as usize;

        for y in y_start..y_end {
            for x in x_start..x_end {
                self.set_pixel(x, y, color);
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        for y in 0..DISPLAY_HEIGHT_PX as usize {
            for x in 0..DISPLAY_WIDTH_PX as usize {
                self.set_pixel(x, y, color);
            }
        }
        Ok(())
    }
}
