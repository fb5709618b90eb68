//! MQTT v5 session over an embassy-net TCP socket
//!
//! A connector owns one set of static buffers and hands them to the single
//! session it opens; after a failure the supervisor resets the device
//! rather than reconnecting.

use core::net::Ipv4Addr;

use embassy_net::tcp::TcpSocket;
use embassy_net::{IpAddress, IpEndpoint, Stack};
use embassy_time::Duration;
use log::{error, info};
use rust_mqtt::client::client::MqttClient;
use rust_mqtt::client::client_config::{ClientConfig, MqttVersion};
use rust_mqtt::packet::v5::publish_packet::QualityOfService;
use rust_mqtt::utils::rng_generator::CountingRng;

use airq_core::config::MqttConfig;
use airq_core::telemetry::{Connector, TelemetryChannel, TelemetryError, Transport};

const SOCKET_BUFFER_LEN: usize = 1024;
const PACKET_BUFFER_LEN: usize = 256;
const MAX_PROPERTIES: usize = 5;
/// Bounds the broker handshake. A publish is cut off much sooner by the
/// per-message timeout in `airq_core::telemetry::publish`.
const SOCKET_TIMEOUT: Duration = Duration::from_secs(10);

pub struct MqttBuffers {
    socket_rx: [u8; SOCKET_BUFFER_LEN],
    socket_tx: [u8; SOCKET_BUFFER_LEN],
    packet_tx: [u8; PACKET_BUFFER_LEN],
    packet_rx: [u8; PACKET_BUFFER_LEN],
}

impl MqttBuffers {
    pub const fn new() -> Self {
        Self {
            socket_rx: [0; SOCKET_BUFFER_LEN],
            socket_tx: [0; SOCKET_BUFFER_LEN],
            packet_tx: [0; PACKET_BUFFER_LEN],
            packet_rx: [0; PACKET_BUFFER_LEN],
        }
    }
}

impl Default for MqttBuffers {
    fn default() -> Self {
        Self::new()
    }
}

pub struct MqttConnector {
    stack: Stack<'static>,
    buffers: Option<&'static mut MqttBuffers>,
}

impl MqttConnector {
    pub fn new(stack: Stack<'static>, buffers: &'static mut MqttBuffers) -> Self {
        Self {
            stack,
            buffers: Some(buffers),
        }
    }
}

type Client = MqttClient<'static, TcpSocket<'static>, MAX_PROPERTIES, CountingRng>;

pub struct MqttTransport {
    client: Client,
}

impl Connector<'static> for MqttConnector {
    type Transport = MqttTransport;

    async fn connect(&mut self, config: &MqttConfig<'static>) -> Result<MqttTransport, TelemetryError> {
        let broker: Ipv4Addr = config.broker.parse().map_err(|_| {
            error!("Broker address {} is not an IPv4 address", config.broker);
            TelemetryError::Connect
        })?;
        let Some(buffers) = self.buffers.take() else {
            error!("MQTT buffers already handed to a session");
            return Err(TelemetryError::Connect);
        };
        let MqttBuffers {
            socket_rx,
            socket_tx,
            packet_tx,
            packet_rx,
        } = buffers;

        let mut socket = TcpSocket::new(self.stack, socket_rx, socket_tx);
        socket.set_timeout(Some(SOCKET_TIMEOUT));
        socket
            .connect(IpEndpoint::new(IpAddress::Ipv4(broker), config.port))
            .await
            .map_err(|e| {
                error!("TCP connect to {}:{} failed: {:?}", broker, config.port, e);
                TelemetryError::Connect
            })?;

        let mut client_config = ClientConfig::new(MqttVersion::MQTTv5, CountingRng(20000));
        client_config.add_client_id(config.client_id);
        client_config.keep_alive = config.keep_alive_secs;
        client_config.max_packet_size = PACKET_BUFFER_LEN as u32;
        if let Some(username) = config.username {
            client_config.add_username(username);
        }
        if let Some(password) = config.password {
            client_config.add_password(password);
        }

        let mut client = MqttClient::<_, MAX_PROPERTIES, _>::new(
            socket,
            packet_tx,
            PACKET_BUFFER_LEN,
            packet_rx,
            PACKET_BUFFER_LEN,
            client_config,
        );
        client.connect_to_broker().await.map_err(|code| {
            error!("Broker refused the session: {:?}", code);
            TelemetryError::Connect
        })?;

        info!("MQTT session open as {}", config.client_id);
        Ok(MqttTransport { client })
    }
}

impl Transport for MqttTransport {
    async fn publish(
        &mut self,
        channel: TelemetryChannel,
        topic: &str,
        payload: &[u8],
    ) -> Result<(), TelemetryError> {
        self.client
            .send_message(topic, payload, QualityOfService::QoS0, false)
            .await
            .map_err(|code| {
                error!("PUBLISH {} rejected: {:?}", topic, code);
                TelemetryError::Publish { channel }
            })
    }
}
