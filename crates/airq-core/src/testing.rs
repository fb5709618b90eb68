//! Recording mocks shared by the unit tests

use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::Cell;
use core::convert::Infallible;
use core::net::Ipv4Addr;

use embassy_time::{Duration, Instant};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource, Operation};

use crate::config::MqttConfig;
use crate::controller::Clock;
use crate::framebuffer::FrameBuffer;
use crate::metrics::OperatingStatus;
use crate::network::{NetworkError, WifiLink};
use crate::screens::{DisplayError, Panel};
use crate::sensors::{AirQualitySensor, AnalogInput, DigitalProbe, ProbeRom, SensorError};
use crate::telemetry::{Connector, TelemetryChannel, TelemetryError, Transport};
use crate::watchdog::Watchdog;

/// Simulated monotonic clock. Delays created from it advance it instantly.
#[derive(Clone, Default)]
pub struct SimClock {
    micros: Rc<Cell<u64>>,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Instant {
        Instant::from_micros(self.micros.get())
    }

    pub fn advance(&self, duration: Duration) {
        self.micros.set(self.micros.get() + duration.as_micros());
    }

    pub fn delay(&self) -> SimDelay {
        SimDelay {
            clock: self.clone(),
        }
    }
}

impl Clock for SimClock {
    fn now(&self) -> Instant {
        SimClock::now(self)
    }
}

pub struct SimDelay {
    clock: SimClock,
}

impl embedded_hal_async::delay::DelayNs for SimDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.clock.advance(Duration::from_micros(ns as u64 / 1000));
    }

    async fn delay_us(&mut self, us: u32) {
        self.clock.advance(Duration::from_micros(us as u64));
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.clock.advance(Duration::from_millis(ms as u64));
    }
}

pub struct FakeAdc {
    samples: Vec<u16>,
    next: usize,
    fail: bool,
}

impl FakeAdc {
    /// Returns the samples in order, starting over after the last one.
    pub fn sequence(samples: &[u16]) -> Self {
        Self {
            samples: samples.to_vec(),
            next: 0,
            fail: false,
        }
    }

    pub fn constant(raw: u16) -> Self {
        Self::sequence(&[raw])
    }

    pub fn failing() -> Self {
        Self {
            samples: Vec::new(),
            next: 0,
            fail: true,
        }
    }
}

impl AnalogInput for FakeAdc {
    fn read_raw(&mut self) -> Result<u16, SensorError> {
        if self.fail || self.samples.is_empty() {
            return Err(SensorError::ReadFailed {
                sensor: "ADC",
                operation: "read sample",
                details: "conversion failed",
            });
        }
        let raw = self.samples[self.next % self.samples.len()];
        self.next += 1;
        Ok(raw)
    }
}

pub struct FakeProbe {
    rom: Option<ProbeRom>,
    scan_fails: bool,
    celsius: f32,
    pub conversions: u32,
}

impl FakeProbe {
    pub fn present(celsius: f32) -> Self {
        Self {
            rom: Some(ProbeRom([0x28, 0xFF, 0x4C, 0x1A, 0x60, 0x17, 0x04, 0x5E])),
            scan_fails: false,
            celsius,
            conversions: 0,
        }
    }

    pub fn absent() -> Self {
        Self {
            rom: None,
            scan_fails: false,
            celsius: 0.0,
            conversions: 0,
        }
    }

    pub fn failing_scan() -> Self {
        Self {
            scan_fails: true,
            ..Self::absent()
        }
    }
}

impl DigitalProbe for FakeProbe {
    async fn discover(&mut self) -> Result<Option<ProbeRom>, SensorError> {
        if self.scan_fails {
            return Err(SensorError::ReadFailed {
                sensor: "DS18B20",
                operation: "search bus",
                details: "bus reset failed",
            });
        }
        Ok(self.rom)
    }

    async fn start_conversion(&mut self) -> Result<(), SensorError> {
        self.conversions += 1;
        Ok(())
    }

    async fn read_celsius(&mut self, _rom: ProbeRom) -> Result<f32, SensorError> {
        Ok(self.celsius)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorCall {
    Initialize,
    Compensate(f32),
    ReadAqi,
    ReadTvoc,
    ReadEco2,
    ReadStatus,
}

pub struct FakeSensor {
    aqi: u8,
    tvoc: u16,
    eco2: u16,
    fail_init: bool,
    fail_reads: bool,
    calls: Vec<SensorCall>,
}

impl FakeSensor {
    pub fn new(aqi: u8, tvoc: u16, eco2: u16) -> Self {
        Self {
            aqi,
            tvoc,
            eco2,
            fail_init: false,
            fail_reads: false,
            calls: Vec::new(),
        }
    }

    pub fn fail_init(&mut self) {
        self.fail_init = true;
    }

    pub fn fail_reads(&mut self) {
        self.fail_reads = true;
    }

    pub fn calls(&self) -> Vec<SensorCall> {
        self.calls.clone()
    }

    fn check(&self, operation: &'static str) -> Result<(), SensorError> {
        if self.fail_reads {
            return Err(SensorError::ReadFailed {
                sensor: "fake",
                operation,
                details: "bus stuck",
            });
        }
        Ok(())
    }
}

impl AirQualitySensor for FakeSensor {
    async fn initialize(&mut self) -> Result<(), SensorError> {
        self.calls.push(SensorCall::Initialize);
        if self.fail_init {
            return Err(SensorError::NotFound { sensor: "fake" });
        }
        Ok(())
    }

    async fn set_compensation_temperature(&mut self, celsius: f32) -> Result<(), SensorError> {
        self.calls.push(SensorCall::Compensate(celsius));
        Ok(())
    }

    async fn read_aqi(&mut self) -> Result<u8, SensorError> {
        self.calls.push(SensorCall::ReadAqi);
        self.check("read AQI")?;
        Ok(self.aqi)
    }

    async fn read_tvoc(&mut self) -> Result<u16, SensorError> {
        self.calls.push(SensorCall::ReadTvoc);
        self.check("read TVOC")?;
        Ok(self.tvoc)
    }

    async fn read_eco2(&mut self) -> Result<u16, SensorError> {
        self.calls.push(SensorCall::ReadEco2);
        self.check("read eCO2")?;
        Ok(self.eco2)
    }

    async fn read_status(&mut self) -> Result<OperatingStatus, SensorError> {
        self.calls.push(SensorCall::ReadStatus);
        self.check("read status")?;
        Ok(OperatingStatus::Normal)
    }
}

/// Remembers every message; optionally fails once `limit` messages went out.
pub struct RecordingTransport {
    sent: Vec<(String, String)>,
    fail_after: Option<usize>,
    stall_after: Option<usize>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            sent: Vec::new(),
            fail_after: None,
            stall_after: None,
        }
    }

    pub fn failing_after(limit: usize) -> Self {
        Self {
            fail_after: Some(limit),
            ..Self::new()
        }
    }

    /// Never completes a publish once `limit` messages went out, like a
    /// broker whose TCP window stays shut.
    pub fn stalling_after(limit: usize) -> Self {
        Self {
            stall_after: Some(limit),
            ..Self::new()
        }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.clone()
    }
}

impl Transport for RecordingTransport {
    async fn publish(
        &mut self,
        channel: TelemetryChannel,
        topic: &str,
        payload: &[u8],
    ) -> Result<(), TelemetryError> {
        if self.fail_after.is_some_and(|limit| self.sent.len() >= limit) {
            return Err(TelemetryError::Publish { channel });
        }
        if self.stall_after.is_some_and(|limit| self.sent.len() >= limit) {
            core::future::pending::<()>().await;
        }
        self.sent.push((
            topic.to_string(),
            String::from_utf8_lossy(payload).to_string(),
        ));
        Ok(())
    }
}

pub struct FakeConnector {
    refuse: bool,
    pub broker: Option<String>,
}

impl FakeConnector {
    pub fn accepting() -> Self {
        Self {
            refuse: false,
            broker: None,
        }
    }

    pub fn refusing() -> Self {
        Self {
            refuse: true,
            broker: None,
        }
    }
}

impl<'a> Connector<'a> for FakeConnector {
    type Transport = RecordingTransport;

    async fn connect(&mut self, config: &MqttConfig<'a>) -> Result<RecordingTransport, TelemetryError> {
        self.broker = Some(config.broker.to_string());
        if self.refuse {
            return Err(TelemetryError::Connect);
        }
        Ok(RecordingTransport::new())
    }
}

#[derive(Debug, Default)]
pub struct CountingWatchdog {
    pub armed: Option<Duration>,
    pub feeds: u32,
}

impl Watchdog for CountingWatchdog {
    fn arm(&mut self, timeout: Duration) {
        self.armed = Some(timeout);
    }

    fn feed(&mut self) {
        self.feeds += 1;
    }
}

pub struct FakeWifi {
    address: Option<Ipv4Addr>,
    polls_before_address: u32,
    polls: u32,
    ssid: Option<String>,
}

impl FakeWifi {
    /// Reports no address for the first `polls` polls.
    pub fn associates_after(polls: u32, address: Ipv4Addr) -> Self {
        Self {
            address: Some(address),
            polls_before_address: polls,
            polls: 0,
            ssid: None,
        }
    }

    pub fn never() -> Self {
        Self {
            address: None,
            polls_before_address: 0,
            polls: 0,
            ssid: None,
        }
    }

    pub fn ssid(&self) -> Option<&str> {
        self.ssid.as_deref()
    }
}

impl WifiLink for FakeWifi {
    async fn begin(&mut self, ssid: &str, _password: &str) -> Result<(), NetworkError> {
        self.ssid = Some(ssid.to_string());
        Ok(())
    }

    async fn poll_address(&mut self) -> Option<Ipv4Addr> {
        self.polls += 1;
        if self.polls > self.polls_before_address {
            self.address
        } else {
            None
        }
    }
}

/// Register file behind one I2C address. The first written byte selects the
/// register, following bytes and reads auto-increment from there.
pub struct FakeRegisterBus {
    address: u8,
    registers: [u8; 256],
}

impl FakeRegisterBus {
    pub fn new(address: u8) -> Self {
        Self {
            address,
            registers: [0; 256],
        }
    }

    pub fn set(&mut self, register: u8, bytes: &[u8]) {
        for (offset, byte) in bytes.iter().enumerate() {
            self.registers[register as usize + offset] = *byte;
        }
    }

    pub fn get(&self, register: u8) -> u8 {
        self.registers[register as usize]
    }
}

impl embedded_hal::i2c::ErrorType for FakeRegisterBus {
    type Error = ErrorKind;
}

impl embedded_hal_async::i2c::I2c for FakeRegisterBus {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if address != self.address {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }

        let mut pointer = 0usize;
        for operation in operations.iter_mut() {
            match operation {
                Operation::Write(bytes) => {
                    if let Some((register, data)) = bytes.split_first() {
                        pointer = *register as usize;
                        for byte in data {
                            self.registers[pointer] = *byte;
                            pointer += 1;
                        }
                    }
                }
                Operation::Read(buffer) => {
                    for slot in buffer.iter_mut() {
                        *slot = self.registers[pointer];
                        pointer += 1;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Panel double drawing into a [`FrameBuffer`] and recording hardware calls.
pub struct RecordingPanel {
    pub frame: FrameBuffer,
    pub powered: bool,
    pub contrast: Option<u8>,
    pub flushes: u32,
    pub power_log: Vec<bool>,
    pub fail_power: bool,
}

impl RecordingPanel {
    pub fn new() -> Self {
        Self {
            frame: FrameBuffer::new(),
            powered: false,
            contrast: None,
            flushes: 0,
            power_log: Vec::new(),
            fail_power: false,
        }
    }

    pub fn broken() -> Self {
        Self {
            fail_power: true,
            ..Self::new()
        }
    }
}

impl OriginDimensions for RecordingPanel {
    fn size(&self) -> Size {
        self.frame.size()
    }
}

impl DrawTarget for RecordingPanel {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        self.frame.draw_iter(pixels)
    }
}

impl Panel for RecordingPanel {
    async fn power_on(&mut self) -> Result<(), DisplayError> {
        if self.fail_power {
            return Err(DisplayError::Power);
        }
        self.powered = true;
        self.power_log.push(true);
        Ok(())
    }

    async fn power_off(&mut self) -> Result<(), DisplayError> {
        if self.fail_power {
            return Err(DisplayError::Power);
        }
        self.powered = false;
        self.power_log.push(false);
        Ok(())
    }

    async fn set_contrast(&mut self, level: u8) -> Result<(), DisplayError> {
        self.contrast = Some(level);
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), DisplayError> {
        if self.fail_power {
            return Err(DisplayError::Bus { operation: "flush" });
        }
        self.flushes += 1;
        Ok(())
    }
}
