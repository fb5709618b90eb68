//! Display mode controller
//!
//! The controller multiplexes the single panel between the display modes on
//! fixed dwell timers. Every tick it:
//!
//! 1. feeds the watchdog,
//! 2. runs the entry actions of a freshly entered mode (once per entry),
//! 3. runs the per-tick work of the mode (animation frames),
//! 4. moves to the next mode in the cycle once the dwell has been exceeded.
//!
//! All devices are owned by a [`Context`] passed into every tick, so the
//! controller itself holds nothing but timers and animation state.

use core::net::Ipv4Addr;

use embassy_time::{Duration, Instant};
use embedded_graphics::prelude::Point;
use embedded_hal_async::delay::DelayNs;
use heapless::Vec;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::animations::{Bounce, Spinner};
use crate::app_state::AppError;
use crate::config::{Config, MAX_CYCLE_LEN, ScheduleConfig};
use crate::sampling::{self, SensorReading};
use crate::screens::{self, Panel};
use crate::sensors::{AirQualitySensor, AnalogInput, DigitalProbe, TemperatureSource};
use crate::telemetry::{self, Topics, Transport};
use crate::watchdog::{LivenessGuard, Watchdog};

/// Pixels per step the bouncing box moves on each axis.
pub const BOUNCE_VELOCITY: Point = Point::new(3, 2);

/// Mutually exclusive presentation states of the panel.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    ShowIp,
    ShowSensor,
    DisplayOff,
    AnimationSpinner,
    AnimationBounce,
}

impl DisplayMode {
    pub const fn label(self) -> &'static str {
        match self {
            Self::ShowIp => "show ip",
            Self::ShowSensor => "show sensor",
            Self::DisplayOff => "display off",
            Self::AnimationSpinner => "spinner",
            Self::AnimationBounce => "bounce",
        }
    }
}

/// Monotonic time source for the run loop.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Every device handle the controller drives.
pub struct Context<'t, Pn, S, P, A, T, W, D> {
    pub panel: Pn,
    pub sensor: S,
    pub temperature: TemperatureSource<P, A>,
    pub transport: T,
    pub topics: Topics<'t>,
    pub watchdog: LivenessGuard<W>,
    pub delay: D,
    pub address: Option<Ipv4Addr>,
}

pub struct Controller {
    schedule: ScheduleConfig,
    mode: DisplayMode,
    cycle_index: usize,
    state_start: Instant,
    pending_entry: bool,
    spinner: Spinner,
    bounce: Bounce,
    last_reading: Option<SensorReading>,
}

impl Controller {
    /// Start in the first mode of the configured cycle.
    pub fn new(config: &Config<'_>, now: Instant) -> Self {
        let schedule = config.schedule.clone();
        let mode = schedule
            .cycle
            .first()
            .copied()
            .unwrap_or(DisplayMode::ShowSensor);

        Self {
            spinner: Spinner::new(Duration::from_millis(schedule.spinner_frame_ms), now),
            bounce: Bounce::new(
                BOUNCE_VELOCITY,
                Duration::from_millis(schedule.bounce_step_ms),
                now,
            ),
            schedule,
            mode,
            cycle_index: 0,
            state_start: now,
            pending_entry: true,
            last_reading: None,
        }
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn mode_started(&self) -> Instant {
        self.state_start
    }

    pub fn last_reading(&self) -> Option<&SensorReading> {
        self.last_reading.as_ref()
    }

    pub fn spinner(&self) -> &Spinner {
        &self.spinner
    }

    pub fn bounce(&self) -> &Bounce {
        &self.bounce
    }

    /// Cycle slot after `index`, wrapping at the end. The cycle is walked by
    /// position, so a mode listed twice is visited twice.
    pub fn next_index(cycle: &Vec<DisplayMode, MAX_CYCLE_LEN>, index: usize) -> usize {
        if cycle.is_empty() {
            return 0;
        }
        (index + 1) % cycle.len()
    }

    /// Advance the machine to `now`.
    pub async fn tick<Pn, S, P, A, T, W, D>(
        &mut self,
        ctx: &mut Context<'_, Pn, S, P, A, T, W, D>,
        now: Instant,
    ) -> Result<(), AppError>
    where
        Pn: Panel,
        S: AirQualitySensor,
        P: DigitalProbe,
        A: AnalogInput,
        T: Transport,
        W: Watchdog,
        D: DelayNs,
    {
        ctx.watchdog.feed(now);

        let elapsed = now.saturating_duration_since(self.state_start);

        if self.pending_entry {
            self.pending_entry = false;
            if elapsed.as_millis() >= self.schedule.entry_window_ms {
                warn!(
                    "Entering {} {} ms late",
                    self.mode.label(),
                    elapsed.as_millis()
                );
            }
            self.enter(ctx, now).await?;
        }

        self.on_tick(ctx, now).await?;

        if elapsed.as_millis() > self.schedule.dwell_ms(self.mode) {
            let index = Self::next_index(&self.schedule.cycle, self.cycle_index);
            let next = self.schedule.cycle.get(index).copied().unwrap_or(self.mode);
            debug!(
                "Mode {} -> {} after {} ms",
                self.mode.label(),
                next.label(),
                elapsed.as_millis()
            );
            self.mode = next;
            self.cycle_index = index;
            self.state_start = now;
            self.pending_entry = true;
        }

        Ok(())
    }

    async fn enter<Pn, S, P, A, T, W, D>(
        &mut self,
        ctx: &mut Context<'_, Pn, S, P, A, T, W, D>,
        now: Instant,
    ) -> Result<(), AppError>
    where
        Pn: Panel,
        S: AirQualitySensor,
        P: DigitalProbe,
        A: AnalogInput,
        T: Transport,
        D: DelayNs,
    {
        let panel = &mut ctx.panel;

        if self.mode == DisplayMode::DisplayOff {
            screens::clear_screen(panel)?;
            panel.flush().await?;
            panel.power_off().await?;
            return Ok(());
        }

        panel.power_on().await?;
        screens::clear_screen(panel)?;

        match self.mode {
            DisplayMode::ShowSensor => {
                screens::sensor::draw_template(panel)?;
                let reading =
                    sampling::sample(&mut ctx.sensor, &mut ctx.temperature, &mut ctx.delay).await?;
                screens::sensor::draw_values(panel, &reading)?;
                panel.flush().await?;

                sampling::log_reading(&reading);
                self.last_reading = Some(reading);
                telemetry::publish(&mut ctx.transport, &ctx.topics, &reading).await?;
            }
            DisplayMode::ShowIp => {
                screens::network::draw(panel, ctx.address)?;
                panel.flush().await?;
            }
            DisplayMode::AnimationSpinner => {
                self.spinner.restart(now);
                self.spinner.draw(panel)?;
                panel.flush().await?;
            }
            DisplayMode::AnimationBounce => {
                self.bounce.restart(now);
                self.bounce.draw(panel)?;
                panel.flush().await?;
            }
            DisplayMode::DisplayOff => {}
        }

        Ok(())
    }

    async fn on_tick<Pn, S, P, A, T, W, D>(
        &mut self,
        ctx: &mut Context<'_, Pn, S, P, A, T, W, D>,
        now: Instant,
    ) -> Result<(), AppError>
    where
        Pn: Panel,
    {
        match self.mode {
            DisplayMode::AnimationSpinner => {
                if self.spinner.advance(now) {
                    self.spinner.draw(&mut ctx.panel)?;
                    ctx.panel.flush().await?;
                }
            }
            DisplayMode::AnimationBounce => {
                if self.bounce.advance(now) {
                    self.bounce.draw(&mut ctx.panel)?;
                    ctx.panel.flush().await?;
                }
            }
            DisplayMode::ShowSensor | DisplayMode::ShowIp | DisplayMode::DisplayOff => {}
        }
        Ok(())
    }

    /// Tick forever at the configured interval. Only returns on failure.
    pub async fn run<C, Pn, S, P, A, T, W, D>(
        &mut self,
        ctx: &mut Context<'_, Pn, S, P, A, T, W, D>,
        clock: &C,
    ) -> AppError
    where
        C: Clock,
        Pn: Panel,
        S: AirQualitySensor,
        P: DigitalProbe,
        A: AnalogInput,
        T: Transport,
        W: Watchdog,
        D: DelayNs,
    {
        let tick_ms = self.schedule.tick_ms as u32;
        info!(
            "Display loop running, first mode {}, tick {} ms",
            self.mode.label(),
            tick_ms
        );

        loop {
            if let Err(e) = self.tick(ctx, clock.now()).await {
                error!("Display loop stopped in {}: {}", self.mode.label(), e);
                return e;
            }
            ctx.delay.delay_ms(tick_ms).await;
        }
    }
}
