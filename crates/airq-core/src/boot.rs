//! Boot sequence
//!
//! Each step brings up one subsystem and appends its outcome to the boot
//! screen. Drawing is best effort: a broken panel must not hide the real
//! failure, so draw errors are logged and otherwise ignored. A failed step
//! returns `AppError::Setup` naming the subsystem; the caller shows the fatal
//! screen and hands the error to the recovery policy.

use core::net::Ipv4Addr;

use embedded_hal_async::delay::DelayNs;
use heapless::Vec;
use log::{error, info, warn};

use crate::app_state::{AppError, AppRunState, Subsystem};
use crate::config::{AnalogCalibration, AssociationConfig, DisplayConfig, InternetConfig, MqttConfig};
use crate::network::{self, WifiLink};
use crate::screens::status::{self, MAX_STATUS_LINES, StatusLine};
use crate::screens::{self, DisplayError, Panel};
use crate::sensors::{AirQualitySensor, AnalogInput, DigitalProbe, TemperatureSource};
use crate::telemetry::Connector;

pub const OK: &str = "OK";
pub const FAIL: &str = "FAIL";

/// Status lines shown so far and the phase reached.
pub struct BootScreen {
    lines: Vec<StatusLine, MAX_STATUS_LINES>,
    state: AppRunState,
}

impl Default for BootScreen {
    fn default() -> Self {
        Self::new()
    }
}

impl BootScreen {
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            state: AppRunState::Uninitialized,
        }
    }

    pub fn state(&self) -> AppRunState {
        self.state
    }

    pub fn lines(&self) -> &[StatusLine] {
        &self.lines
    }

    /// Boot finished, the display loop takes over the panel.
    pub fn finish(&mut self) {
        self.state = AppRunState::Running;
        info!("Boot complete");
    }

    /// Append a line and redraw. Never fails.
    pub async fn report<Pn: Panel>(
        &mut self,
        panel: &mut Pn,
        subsystem: Subsystem,
        outcome: &'static str,
    ) {
        info!("{}: {}", subsystem.label(), outcome);
        if self.lines.push(StatusLine { subsystem, outcome }).is_err() {
            warn!("Boot screen full, {} not shown", subsystem.label());
        }
        if let Err(e) = status::draw_boot(panel, &self.lines) {
            warn!("Boot screen draw failed: {}", e);
            return;
        }
        if let Err(e) = panel.flush().await {
            warn!("Boot screen flush failed: {}", e);
        }
    }

    async fn fail<Pn: Panel>(&mut self, panel: &mut Pn, subsystem: Subsystem) -> AppError {
        self.report(panel, subsystem, FAIL).await;
        self.state = AppRunState::Error;
        AppError::Setup(subsystem)
    }
}

async fn bring_up_panel<Pn: Panel>(panel: &mut Pn, contrast: u8) -> Result<(), DisplayError> {
    panel.power_on().await?;
    panel.set_contrast(contrast).await?;
    screens::clear_screen(panel)?;
    panel.flush().await
}

/// Power the panel up, apply the contrast and clear it.
pub async fn start_display<Pn: Panel>(
    panel: &mut Pn,
    config: &DisplayConfig,
    screen: &mut BootScreen,
) -> Result<(), AppError> {
    match bring_up_panel(panel, config.contrast).await {
        Ok(()) => {
            screen.state = AppRunState::DisplayReady;
            screen.report(panel, Subsystem::Display, OK).await;
            Ok(())
        }
        Err(e) => {
            error!("Display setup failed: {}", e);
            Err(screen.fail(panel, Subsystem::Display).await)
        }
    }
}

pub async fn start_sensor<Pn, S>(
    panel: &mut Pn,
    sensor: &mut S,
    screen: &mut BootScreen,
) -> Result<(), AppError>
where
    Pn: Panel,
    S: AirQualitySensor,
{
    match sensor.initialize().await {
        Ok(()) => {
            screen.state = AppRunState::SensorReady;
            screen.report(panel, Subsystem::Sensor, OK).await;
            Ok(())
        }
        Err(e) => {
            error!("Sensor setup failed: {}", e);
            Err(screen.fail(panel, Subsystem::Sensor).await)
        }
    }
}

/// Pick the temperature source for the whole run and show which one it is.
pub async fn select_temperature<Pn, P, A>(
    panel: &mut Pn,
    probe: P,
    analog: A,
    calibration: AnalogCalibration,
    screen: &mut BootScreen,
) -> TemperatureSource<P, A>
where
    Pn: Panel,
    P: DigitalProbe,
    A: AnalogInput,
{
    let source = TemperatureSource::select(probe, analog, calibration).await;
    screen
        .report(panel, Subsystem::Probe, source.kind().label())
        .await;
    source
}

pub async fn join_network<Pn, L, D>(
    panel: &mut Pn,
    link: &mut L,
    internet: &InternetConfig<'_>,
    association: &AssociationConfig,
    delay: &mut D,
    screen: &mut BootScreen,
) -> Result<Ipv4Addr, AppError>
where
    Pn: Panel,
    L: WifiLink,
    D: DelayNs,
{
    screen.state = AppRunState::WifiConnecting;
    match network::connect(link, internet, association, delay).await {
        Ok(address) => {
            screen.state = AppRunState::WifiConnected;
            screen.report(panel, Subsystem::Wifi, OK).await;
            Ok(address)
        }
        Err(e) => {
            error!("Wi-Fi setup failed: {}", e);
            Err(screen.fail(panel, Subsystem::Wifi).await)
        }
    }
}

pub async fn connect_broker<'a, Pn, C>(
    panel: &mut Pn,
    connector: &mut C,
    mqtt: &MqttConfig<'a>,
    screen: &mut BootScreen,
) -> Result<C::Transport, AppError>
where
    Pn: Panel,
    C: Connector<'a>,
{
    info!("Connecting to MQTT broker {}:{}", mqtt.broker, mqtt.port);
    match connector.connect(mqtt).await {
        Ok(transport) => {
            screen.state = AppRunState::BrokerConnected;
            screen.report(panel, Subsystem::Broker, OK).await;
            Ok(transport)
        }
        Err(e) => {
            error!("MQTT setup failed: {}", e);
            Err(screen.fail(panel, Subsystem::Broker).await)
        }
    }
}

/// Best-effort fatal screen before the supervisor halts or restarts.
pub async fn show_fatal<Pn: Panel>(panel: &mut Pn, error: &AppError) {
    error!("Fatal: {}", error);
    // The panel may have been switched off by the display loop
    if let Err(e) = panel.power_on().await {
        warn!("Fatal screen power on failed: {}", e);
    }
    if let Err(e) = status::draw_fatal(panel, error) {
        warn!("Fatal screen draw failed: {}", e);
        return;
    }
    if let Err(e) = panel.flush().await {
        warn!("Fatal screen flush failed: {}", e);
    }
}
