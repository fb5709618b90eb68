//! Screen-saver animations
//!
//! Both animations keep their own frame timer and only redraw when a frame is
//! due, so the controller can call them on every tick. State survives leaving
//! and re-entering the mode; only the timers restart.

use embassy_time::{Duration, Instant};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Line, PrimitiveStyle, Rectangle};

use crate::screens::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX, DisplayError, clear_area, clear_screen};

/// Four line orientations: vertical, rising diagonal, horizontal, falling diagonal.
pub const SPINNER_FRAMES: u8 = 4;

const SPINNER_RADIUS: i32 = 12;
const SPINNER_STROKE: u32 = 3;

/// Rotating line centred on the screen.
#[derive(Debug, Clone)]
pub struct Spinner {
    frame: u8,
    interval: Duration,
    last_frame: Instant,
}

impl Spinner {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            frame: 0,
            interval,
            last_frame: now,
        }
    }

    pub fn frame(&self) -> u8 {
        self.frame
    }

    /// Restart the frame timer without touching the current frame.
    pub fn restart(&mut self, now: Instant) {
        self.last_frame = now;
    }

    /// Move to the next frame if one is due. Returns `true` when it did.
    pub fn advance(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last_frame) < self.interval {
            return false;
        }
        self.frame = (self.frame + 1) % SPINNER_FRAMES;
        self.last_frame = now;
        true
    }

    fn endpoints(&self) -> (Point, Point) {
        let r = SPINNER_RADIUS;
        let (dx, dy) = match self.frame {
            0 => (0, r),
            1 => (r, -r),
            2 => (r, 0),
            _ => (r, r),
        };
        let center = Point::new(DISPLAY_WIDTH_PX as i32 / 2, DISPLAY_HEIGHT_PX as i32 / 2);
        (center - Point::new(dx, dy), center + Point::new(dx, dy))
    }

    pub fn draw<D>(&self, target: &mut D) -> Result<(), DisplayError>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        let extent = (SPINNER_RADIUS + SPINNER_STROKE as i32) * 2;
        clear_area(
            target,
            DISPLAY_WIDTH_PX as i32 / 2 - extent / 2,
            DISPLAY_HEIGHT_PX as i32 / 2 - extent / 2,
            extent as u32 + 1,
            extent as u32 + 1,
        )?;
        let (start, end) = self.endpoints();
        Line::new(start, end)
            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, SPINNER_STROKE))
            .draw(target)
            .map_err(|_| DisplayError::Draw)
    }
}

pub const BOUNCE_BOX_PX: u32 = 8;

/// Filled square moving diagonally and reflecting off the screen edges.
#[derive(Debug, Clone)]
pub struct Bounce {
    position: Point,
    velocity: Point,
    interval: Duration,
    last_step: Instant,
}

impl Bounce {
    pub fn new(velocity: Point, interval: Duration, now: Instant) -> Self {
        Self {
            position: Point::zero(),
            velocity,
            interval,
            last_step: now,
        }
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn velocity(&self) -> Point {
        self.velocity
    }

    pub fn restart(&mut self, now: Instant) {
        self.last_step = now;
    }

    fn max_position() -> Point {
        Point::new(
            (DISPLAY_WIDTH_PX - BOUNCE_BOX_PX) as i32,
            (DISPLAY_HEIGHT_PX - BOUNCE_BOX_PX) as i32,
        )
    }

    /// Move one step. An axis that reaches an edge is clamped to it and its
    /// velocity component points back into the screen.
    pub fn step(&mut self) {
        let max = Self::max_position();
        self.position += self.velocity;

        if self.position.x <= 0 {
            self.position.x = 0;
            self.velocity.x = self.velocity.x.abs();
        } else if self.position.x >= max.x {
            self.position.x = max.x;
            self.velocity.x = -self.velocity.x.abs();
        }

        if self.position.y <= 0 {
            self.position.y = 0;
            self.velocity.y = self.velocity.y.abs();
        } else if self.position.y >= max.y {
            self.position.y = max.y;
            self.velocity.y = -self.velocity.y.abs();
        }
    }

    /// Step once if the step interval has passed. Returns `true` when it moved.
    pub fn advance(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last_step) < self.interval {
            return false;
        }
        self.step();
        self.last_step = now;
        true
    }

    pub fn draw<D>(&self, target: &mut D) -> Result<(), DisplayError>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        clear_screen(target)?;
        target
            .fill_solid(
                &Rectangle::new(self.position, Size::new(BOUNCE_BOX_PX, BOUNCE_BOX_PX)),
                BinaryColor::On,
            )
            .map_err(|_| DisplayError::Draw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framebuffer::FrameBuffer;
    use proptest::prelude::*;

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    #[test]
    fn spinner_waits_for_interval() {
        let mut spinner = Spinner::new(Duration::from_millis(200), at(0));
        assert!(!spinner.advance(at(150)));
        assert_eq!(spinner.frame(), 0);
        assert!(spinner.advance(at(200)));
        assert_eq!(spinner.frame(), 1);
        assert!(!spinner.advance(at(350)));
    }

    #[test]
    fn spinner_cycles_through_four_frames() {
        let mut spinner = Spinner::new(Duration::from_millis(200), at(0));
        let mut seen = [0u8; 8];
        for (i, slot) in seen.iter_mut().enumerate() {
            spinner.advance(at((i as u64 + 1) * 200));
            *slot = spinner.frame();
        }
        assert_eq!(seen, [1, 2, 3, 0, 1, 2, 3, 0]);
    }

    #[test]
    fn spinner_restart_keeps_frame() {
        let mut spinner = Spinner::new(Duration::from_millis(200), at(0));
        spinner.advance(at(200));
        spinner.restart(at(1000));
        assert_eq!(spinner.frame(), 1);
        assert!(!spinner.advance(at(1100)));
    }

    #[test]
    fn spinner_draws_each_frame_differently() {
        let mut spinner = Spinner::new(Duration::from_millis(1), at(0));
        let mut first = FrameBuffer::new();
        spinner.draw(&mut first).unwrap();
        spinner.advance(at(1));
        let mut second = FrameBuffer::new();
        spinner.draw(&mut second).unwrap();

        assert!(first.lit_pixels() > 0);
        let center = Point::new(DISPLAY_WIDTH_PX as i32 / 2, DISPLAY_HEIGHT_PX as i32 / 2);
        let top = Point::new(center.x, center.y - SPINNER_RADIUS + 1);
        assert_eq!(first.pixel(top.x, top.y), BinaryColor::On);
        assert_eq!(second.pixel(top.x, top.y), BinaryColor::Off);
    }

    #[test]
    fn bounce_reflects_off_right_edge() {
        let mut bounce = Bounce::new(Point::new(5, 0), Duration::from_millis(50), at(0));
        for _ in 0..30 {
            bounce.step();
        }
        // 120 is the last column the box fits at; 24 steps of 5 reach it exactly.
        assert!(bounce.velocity().x < 0);
        assert!(bounce.position().x < 120);
    }

    #[test]
    fn corner_hit_reflects_both_axes_at_once() {
        let mut bounce = Bounce::new(Point::new(-3, -2), Duration::from_millis(50), at(0));
        bounce.step();
        assert_eq!(bounce.position(), Point::zero());
        assert_eq!(bounce.velocity(), Point::new(3, 2));

        // 8 steps of (15, 7) land exactly on the far corner (120, 56).
        let mut bounce = Bounce::new(Point::new(15, 7), Duration::from_millis(50), at(0));
        for _ in 0..7 {
            bounce.step();
        }
        assert_eq!(bounce.velocity(), Point::new(15, 7));
        bounce.step();
        assert_eq!(bounce.position(), Bounce::max_position());
        assert_eq!(bounce.velocity(), Point::new(-15, -7));
    }

    #[test]
    fn bounce_draws_box_at_position() {
        let mut bounce = Bounce::new(Point::new(3, 2), Duration::from_millis(50), at(0));
        bounce.step();
        let mut fb = FrameBuffer::new();
        bounce.draw(&mut fb).unwrap();
        assert_eq!(fb.lit_pixels(), (BOUNCE_BOX_PX * BOUNCE_BOX_PX) as usize);
        assert_eq!(fb.pixel(3, 2), BinaryColor::On);
    }

    proptest! {
        #[test]
        fn bounce_stays_on_screen(vx in -9i32..=9, vy in -9i32..=9, steps in 0usize..500) {
            let mut bounce = Bounce::new(Point::new(vx, vy), Duration::from_millis(50), at(0));
            let max = Bounce::max_position();
            for _ in 0..steps {
                bounce.step();
                let p = bounce.position();
                prop_assert!(p.x >= 0 && p.x <= max.x);
                prop_assert!(p.y >= 0 && p.y <= max.y);
            }
            prop_assert_eq!(bounce.velocity().x.abs(), vx.abs());
            prop_assert_eq!(bounce.velocity().y.abs(), vy.abs());
        }

        #[test]
        fn spinner_frame_has_period_four(advances in 0u64..64) {
            let mut spinner = Spinner::new(Duration::from_millis(200), at(0));
            for i in 1..=advances {
                spinner.advance(at(i * 200));
            }
            prop_assert_eq!(spinner.frame() as u64, advances % 4);
        }
    }
}
