//! Station-mode Wi-Fi over esp-radio with an embassy-net DHCP stack

use core::net::Ipv4Addr;

use embassy_net::Stack;
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController};
use log::{error, info};

use airq_core::network::{NetworkError, WifiLink};

pub struct EspWifiLink<'d> {
    controller: WifiController<'d>,
    stack: Stack<'d>,
}

impl<'d> EspWifiLink<'d> {
    pub fn new(controller: WifiController<'d>, stack: Stack<'d>) -> Self {
        Self { controller, stack }
    }
}

impl WifiLink for EspWifiLink<'_> {
    async fn begin(&mut self, ssid: &str, password: &str) -> Result<(), NetworkError> {
        let client = ClientConfig::default()
            .with_ssid(ssid.into())
            .with_password(password.into());
        self.controller
            .set_config(&ModeConfig::Client(client))
            .map_err(|e| {
                error!("Wi-Fi mode config failed: {:?}", e);
                NetworkError::Config
            })?;

        if !self.controller.is_started().unwrap_or(false) {
            self.controller.start_async().await.map_err(|e| {
                error!("Wi-Fi start failed: {:?}", e);
                NetworkError::Link
            })?;
            info!("Wi-Fi started");
        }

        self.controller.connect_async().await.map_err(|e| {
            error!("Wi-Fi connect failed: {:?}", e);
            NetworkError::Link
        })
    }

    async fn poll_address(&mut self) -> Option<Ipv4Addr> {
        if !self.stack.is_link_up() {
            return None;
        }
        self.stack.config_v4().map(|config| config.address.address())
    }
}
