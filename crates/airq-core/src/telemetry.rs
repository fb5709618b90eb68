//! Telemetry publisher
//!
//! Pushes the three scalar metrics of a [`SensorReading`] to their MQTT
//! topics. Publishing is fire-and-forget: nothing waits for an
//! acknowledgement and a transport error is returned to the caller instead of
//! being retried here. Each message gets a bounded time slot so a stalled
//! broker surfaces as an error before the watchdog fires.

use core::fmt::Write;

use embassy_time::{Duration, with_timeout};
use heapless::String;
use log::{debug, error};
use thiserror_no_std::Error;

use crate::config::MqttConfig;
use crate::sampling::SensorReading;

/// Longest payload a single metric can produce ("65535").
const PAYLOAD_CAPACITY: usize = 8;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryError {
    #[error("failed to connect to the broker")]
    Connect,
    #[error("failed to publish on the {channel} channel")]
    Publish { channel: TelemetryChannel },
    #[error("publish on the {channel} channel timed out")]
    Timeout { channel: TelemetryChannel },
    #[error("payload does not fit the publish buffer")]
    PayloadTooLong,
}

/// The three fixed metric channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryChannel {
    Aqi,
    Tvoc,
    Eco2,
}

impl TelemetryChannel {
    /// Publish order for one reading.
    pub const ALL: [Self; 3] = [Self::Aqi, Self::Tvoc, Self::Eco2];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Aqi => "aqi",
            Self::Tvoc => "tvoc",
            Self::Eco2 => "eco2",
        }
    }

    /// The numeric value this channel carries for a reading.
    pub fn value(self, reading: &SensorReading) -> u16 {
        match self {
            Self::Aqi => reading.aqi.value as u16,
            Self::Tvoc => reading.tvoc_ppb,
            Self::Eco2 => reading.eco2.value,
        }
    }
}

impl core::fmt::Display for TelemetryChannel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Message sink, normally an MQTT client with an open session.
pub trait Transport {
    fn publish(
        &mut self,
        channel: TelemetryChannel,
        topic: &str,
        payload: &[u8],
    ) -> impl Future<Output = Result<(), TelemetryError>>;
}

/// Opens a [`Transport`] session with the broker.
///
/// `'a` is the lifetime of the configuration strings, which a session may
/// keep borrowing (client id, credentials) for as long as it is open.
pub trait Connector<'a> {
    type Transport: Transport;

    fn connect(
        &mut self,
        config: &MqttConfig<'a>,
    ) -> impl Future<Output = Result<Self::Transport, TelemetryError>>;
}

/// Topic names for each channel.
#[derive(Debug, Clone, Copy)]
pub struct Topics<'a> {
    pub aqi: &'a str,
    pub tvoc: &'a str,
    pub eco2: &'a str,
    /// Upper bound on a single message.
    pub publish_timeout: Duration,
}

impl<'a> Topics<'a> {
    pub fn from_config(config: &MqttConfig<'a>) -> Self {
        Self {
            aqi: config.aqi_topic,
            tvoc: config.tvoc_topic,
            eco2: config.eco2_topic,
            publish_timeout: config.publish_timeout(),
        }
    }

    pub fn topic(&self, channel: TelemetryChannel) -> &'a str {
        match channel {
            TelemetryChannel::Aqi => self.aqi,
            TelemetryChannel::Tvoc => self.tvoc,
            TelemetryChannel::Eco2 => self.eco2,
        }
    }
}

/// Decimal text payload for one value.
pub fn format_payload(value: u16) -> Result<String<PAYLOAD_CAPACITY>, TelemetryError> {
    let mut payload = String::new();
    write!(payload, "{}", value).map_err(|_| TelemetryError::PayloadTooLong)?;
    Ok(payload)
}

/// Send one message per channel. Stops at the first transport error.
pub async fn publish<T: Transport>(
    transport: &mut T,
    topics: &Topics<'_>,
    reading: &SensorReading,
) -> Result<(), TelemetryError> {
    for channel in TelemetryChannel::ALL {
        let topic = topics.topic(channel);
        let payload = format_payload(channel.value(reading))?;
        with_timeout(
            topics.publish_timeout,
            transport.publish(channel, topic, payload.as_bytes()),
        )
        .await
        .unwrap_or(Err(TelemetryError::Timeout { channel }))
        .inspect_err(|e| error!("Publish to {} failed: {}", topic, e))?;
        debug!("Published {} -> {}", payload, topic);
    }
    Ok(())
}
