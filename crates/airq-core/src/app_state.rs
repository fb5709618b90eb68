//! Application-wide run state and error types

use thiserror_no_std::Error;

use crate::network::NetworkError;
use crate::screens::DisplayError;
use crate::sensors::SensorError;
use crate::telemetry::TelemetryError;

/// Boot and run phases, in the order the firmware walks through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppRunState {
    Uninitialized,
    DisplayReady,
    SensorReady,
    WifiConnecting,
    WifiConnected,
    BrokerConnected,
    Running,
    Error,
}

/// Hardware or service brought up during boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subsystem {
    Display,
    Sensor,
    Probe,
    Wifi,
    Broker,
}

impl Subsystem {
    /// Label used on the boot screen.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Display => "Display",
            Self::Sensor => "Sensor",
            Self::Probe => "Probe",
            Self::Wifi => "WiFi",
            Self::Broker => "MQTT",
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppError {
    #[error("{} setup failed", .0.label())]
    Setup(Subsystem),
    #[error("Sensor error: {0}")]
    Sensor(SensorError),
    #[error("Display error: {0}")]
    Display(DisplayError),
    #[error("Telemetry error: {0}")]
    Telemetry(TelemetryError),
    #[error("Network error: {0}")]
    Network(NetworkError),
    #[error("Invalid configuration: {0}")]
    Config(&'static str),
}

/// Failure classes the supervisor distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal during startup, before the main loop runs.
    Setup,
    /// Network or broker trouble.
    Transport,
    /// Device I/O failing inside the loop.
    Device,
}

impl AppError {
    pub fn severity(&self) -> Severity {
        match self {
            Self::Setup(Subsystem::Wifi | Subsystem::Broker) => Severity::Transport,
            Self::Setup(_) | Self::Config(_) => Severity::Setup,
            Self::Telemetry(_) | Self::Network(_) => Severity::Transport,
            Self::Sensor(_) | Self::Display(_) => Severity::Device,
        }
    }
}

impl From<SensorError> for AppError {
    fn from(value: SensorError) -> Self {
        Self::Sensor(value)
    }
}

impl From<DisplayError> for AppError {
    fn from(value: DisplayError) -> Self {
        Self::Display(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<NetworkError> for AppError {
    fn from(value: NetworkError) -> Self {
        Self::Network(value)
    }
}
