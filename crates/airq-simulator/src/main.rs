//! Desktop simulator for the air-quality display firmware.
//!
//! Runs the real boot sequence and display controller from `airq-core`
//! against synthetic devices, rendering the 128x64 panel in an SDL2 window
//! via `embedded-graphics-simulator`. Telemetry goes to the log.
//!
//! # Key bindings
//!
//! | Key | Action |
//! |-----|--------|
//! | Q   | Quit   |
//!
//! Pass `--analog` to boot without a digital probe and exercise the ADC
//! fallback.

use std::convert::Infallible;
use std::net::Ipv4Addr;
use std::time::Duration as StdDuration;

use embassy_futures::block_on;
use embassy_time::{Delay, Duration, Instant};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics_simulator::{
    BinaryColorTheme, OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window,
    sdl2::Keycode,
};
use log::{debug, error, info};

use airq_core::app_state::AppError;
use airq_core::boot::{self, BootScreen};
use airq_core::config::{Config, MqttConfig};
use airq_core::controller::{Clock, Context, Controller};
use airq_core::framebuffer::FrameBuffer;
use airq_core::metrics::OperatingStatus;
use airq_core::network::{NetworkError, WifiLink};
use airq_core::recovery::{RecoveryAction, RecoveryPolicy};
use airq_core::screens::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX, DisplayError, Panel};
use airq_core::sensors::{AirQualitySensor, AnalogInput, DigitalProbe, ProbeRom, SensorError};
use airq_core::telemetry::{Connector, TelemetryChannel, TelemetryError, Topics, Transport};
use airq_core::watchdog::{LivenessGuard, Watchdog};

/// Pixel scale factor for the simulator window.
const WINDOW_SCALE: u32 = 4;

/// Polls before the simulated access point hands out an address.
const ASSOCIATION_POLLS: u32 = 3;

/// Simulated probe conversion; the real DS18B20 takes 750 ms.
const PROBE_CONVERSION: Duration = Duration::from_millis(20);

// ---------------------------------------------------------------------------
// Panel
// ---------------------------------------------------------------------------

/// Frame buffer in front of the simulator display, mimicking the OLED's own
/// buffer: nothing reaches the window until `flush`.
struct SimPanel {
    frame: FrameBuffer,
    display: SimulatorDisplay<BinaryColor>,
    powered: bool,
}

impl SimPanel {
    fn new() -> Self {
        Self {
            frame: FrameBuffer::new(),
            display: SimulatorDisplay::new(Size::new(DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX)),
            powered: false,
        }
    }

    /// Copy every pixel after a power cycle.
    fn redraw_all(&mut self) {
        let frame = &self.frame;
        let pixels = self
            .display
            .bounding_box()
            .points()
            .map(|p| Pixel(p, frame.pixel(p.x, p.y)));
        let _ = self.display.draw_iter(pixels);
    }
}

impl OriginDimensions for SimPanel {
    fn size(&self) -> Size {
        Size::new(DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX)
    }
}

impl DrawTarget for SimPanel {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        self.frame.draw_iter(pixels)
    }
}

impl Panel for SimPanel {
    async fn power_on(&mut self) -> Result<(), DisplayError> {
        if !self.powered {
            self.powered = true;
            self.redraw_all();
        }
        Ok(())
    }

    async fn power_off(&mut self) -> Result<(), DisplayError> {
        self.powered = false;
        let _ = self.display.clear(BinaryColor::Off);
        Ok(())
    }

    async fn set_contrast(&mut self, level: u8) -> Result<(), DisplayError> {
        info!("Contrast {:#04X}", level);
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), DisplayError> {
        if self.powered {
            let _ = self.frame.flush(&mut self.display);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Mock devices
// ---------------------------------------------------------------------------

fn elapsed_secs() -> f64 {
    Instant::now().as_millis() as f64 / 1000.0
}

/// ENS160 stand-in with slowly drifting values.
struct MockAirQuality;

impl AirQualitySensor for MockAirQuality {
    async fn initialize(&mut self) -> Result<(), SensorError> {
        Ok(())
    }

    async fn set_compensation_temperature(&mut self, celsius: f32) -> Result<(), SensorError> {
        debug!("Compensation {:.2} C", celsius);
        Ok(())
    }

    async fn read_aqi(&mut self) -> Result<u8, SensorError> {
        let t = elapsed_secs();
        Ok((3.0 + 2.0 * (t / 40.0).sin()).round().clamp(1.0, 5.0) as u8)
    }

    async fn read_tvoc(&mut self) -> Result<u16, SensorError> {
        let t = elapsed_secs();
        Ok((250.0 + 200.0 * (t / 25.0).sin()) as u16)
    }

    async fn read_eco2(&mut self) -> Result<u16, SensorError> {
        let t = elapsed_secs();
        Ok((700.0 + 300.0 * (t / 60.0).sin()) as u16)
    }

    async fn read_status(&mut self) -> Result<OperatingStatus, SensorError> {
        Ok(OperatingStatus::Normal)
    }
}

struct MockProbe {
    present: bool,
}

impl DigitalProbe for MockProbe {
    async fn discover(&mut self) -> Result<Option<ProbeRom>, SensorError> {
        Ok(self
            .present
            .then_some(ProbeRom([0x28, 0xAA, 0x1C, 0x43, 0x05, 0x00, 0x00, 0x5D])))
    }

    async fn start_conversion(&mut self) -> Result<(), SensorError> {
        Ok(())
    }

    async fn read_celsius(&mut self, _rom: ProbeRom) -> Result<f32, SensorError> {
        let t = elapsed_secs();
        Ok((22.0 + 1.5 * (t / 90.0).sin()) as f32)
    }

    fn conversion_time(&self) -> Duration {
        PROBE_CONVERSION
    }
}

/// On-chip sensor stand-in: a fixed raw count near room temperature.
struct MockAdc;

impl AnalogInput for MockAdc {
    fn read_raw(&mut self) -> Result<u16, SensorError> {
        Ok(13_900)
    }
}

struct MockWifi {
    polls: u32,
}

impl WifiLink for MockWifi {
    async fn begin(&mut self, ssid: &str, _password: &str) -> Result<(), NetworkError> {
        info!("Associating with simulated access point {:?}", ssid);
        Ok(())
    }

    async fn poll_address(&mut self) -> Option<Ipv4Addr> {
        self.polls += 1;
        (self.polls >= ASSOCIATION_POLLS).then_some(Ipv4Addr::new(192, 168, 1, 50))
    }
}

/// Prints every publish instead of talking to a broker.
struct LogTransport;

impl Transport for LogTransport {
    async fn publish(
        &mut self,
        channel: TelemetryChannel,
        topic: &str,
        payload: &[u8],
    ) -> Result<(), TelemetryError> {
        info!(
            "PUBLISH [{}] {} = {}",
            channel,
            topic,
            String::from_utf8_lossy(payload)
        );
        Ok(())
    }
}

struct LogConnector;

impl<'a> Connector<'a> for LogConnector {
    type Transport = LogTransport;

    async fn connect(&mut self, config: &MqttConfig<'a>) -> Result<LogTransport, TelemetryError> {
        info!("Simulated broker session as {}", config.client_id);
        Ok(LogTransport)
    }
}

struct LogWatchdog;

impl Watchdog for LogWatchdog {
    fn arm(&mut self, timeout: Duration) {
        info!("Watchdog armed ({} ms)", timeout.as_millis());
    }

    fn feed(&mut self) {}
}

struct HostClock;

impl Clock for HostClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn fatal(panel: &mut SimPanel, policy: &RecoveryPolicy, error: &AppError) {
    block_on(boot::show_fatal(panel, error));
    match policy.decide(error) {
        RecoveryAction::Halt => error!("Device would halt: {}", error),
        RecoveryAction::RestartAfter(delay) => error!(
            "Device would restart in {} ms: {}",
            delay.as_millis(),
            error
        ),
    }
}

fn main() {
    env_logger::init();
    info!("Starting air-quality simulator");
    info!(
        "Display: {}x{} (scale {}x)",
        DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX, WINDOW_SCALE
    );

    let probe_present = !std::env::args().any(|arg| arg == "--analog");

    let mut config = Config::default();
    config.internet.ssid = "simulated";
    let policy = RecoveryPolicy::new(&config.recovery);

    let output_settings = OutputSettingsBuilder::new()
        .scale(WINDOW_SCALE)
        .theme(BinaryColorTheme::OledBlue)
        .build();
    let mut window = Window::new("Air Quality Simulator", &output_settings);

    let mut panel = SimPanel::new();
    let mut sensor = MockAirQuality;
    let mut screen = BootScreen::new();

    let booted = block_on(async {
        config.validate()?;
        boot::start_display(&mut panel, &config.display, &mut screen).await?;
        boot::start_sensor(&mut panel, &mut sensor, &mut screen).await?;
        let temperature = boot::select_temperature(
            &mut panel,
            MockProbe {
                present: probe_present,
            },
            MockAdc,
            config.analog,
            &mut screen,
        )
        .await;
        let address = boot::join_network(
            &mut panel,
            &mut MockWifi { polls: 0 },
            &config.internet,
            &config.association,
            &mut Delay,
            &mut screen,
        )
        .await?;
        let transport =
            boot::connect_broker(&mut panel, &mut LogConnector, &config.mqtt, &mut screen).await?;
        Ok::<_, AppError>((temperature, address, transport))
    });

    // The SDL window is lazily initialized on the first `update()` call.
    // We must call `update()` once before `events()` or it will panic.
    window.update(&panel.display);

    let (temperature, address, transport) = match booted {
        Ok(parts) => parts,
        Err(e) => {
            fatal(&mut panel, &policy, &e);
            window.show_static(&panel.display);
            return;
        }
    };
    screen.finish();

    let mut ctx = Context {
        panel,
        sensor,
        temperature,
        transport,
        topics: Topics::from_config(&config.mqtt),
        watchdog: LivenessGuard::arm(LogWatchdog, config.watchdog.timeout(), Instant::now()),
        delay: Delay,
        address: Some(address),
    };
    let clock = HostClock;
    let mut controller = Controller::new(&config, clock.now());
    let tick = StdDuration::from_millis(config.schedule.tick_ms);

    'running: loop {
        for event in window.events() {
            match event {
                SimulatorEvent::Quit => break 'running,
                SimulatorEvent::KeyDown { keycode, .. }
                    if keycode == Keycode::Q || keycode == Keycode::Escape =>
                {
                    break 'running;
                }
                _ => {}
            }
        }

        if let Err(e) = block_on(controller.tick(&mut ctx, clock.now())) {
            fatal(&mut ctx.panel, &policy, &e);
            window.show_static(&ctx.panel.display);
            return;
        }

        window.update(&ctx.panel.display);
        std::thread::sleep(tick);
    }

    info!(
        "Simulator exiting after {} watchdog feeds, longest gap {} ms",
        ctx.watchdog.feeds(),
        ctx.watchdog.longest_gap().as_millis()
    );
}
