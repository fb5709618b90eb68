//! Wi-Fi association with a bounded number of status polls

use core::net::Ipv4Addr;

use embedded_hal_async::delay::DelayNs;
use log::{error, info};
use thiserror_no_std::Error;

use crate::config::{AssociationConfig, InternetConfig};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkError {
    #[error("not associated after {polls} status polls")]
    Association { polls: u32 },
    #[error("radio rejected the station configuration")]
    Config,
    #[error("radio failed to start or join the access point")]
    Link,
}

/// Station-mode Wi-Fi link.
pub trait WifiLink {
    /// Start associating with an access point. Does not wait for the result.
    fn begin(&mut self, ssid: &str, password: &str) -> impl Future<Output = Result<(), NetworkError>>;

    /// Address leased by DHCP once associated, `None` until then.
    fn poll_address(&mut self) -> impl Future<Output = Option<Ipv4Addr>>;
}

/// Associate and wait for an address, polling at most `max_polls` times.
pub async fn connect<L, D>(
    link: &mut L,
    internet: &InternetConfig<'_>,
    association: &AssociationConfig,
    delay: &mut D,
) -> Result<Ipv4Addr, NetworkError>
where
    L: WifiLink,
    D: DelayNs,
{
    info!("Wi-Fi connecting to {}", internet.ssid);
    link.begin(internet.ssid, internet.password).await?;

    for _ in 0..association.max_polls {
        if let Some(address) = link.poll_address().await {
            info!("Wi-Fi connected, address {}", address);
            return Ok(address);
        }
        delay.delay_ms(association.poll_interval_ms).await;
    }

    error!(
        "Wi-Fi not associated after {} polls",
        association.max_polls
    );
    Err(NetworkError::Association {
        polls: association.max_polls,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeWifi, SimClock};
    use embassy_futures::block_on;

    #[test]
    fn returns_address_once_associated() {
        let clock = SimClock::new();
        let mut delay = clock.delay();
        let mut link = FakeWifi::associates_after(3, Ipv4Addr::new(192, 168, 1, 42));

        let address = block_on(connect(
            &mut link,
            &InternetConfig {
                ssid: "lab",
                password: "secret",
            },
            &AssociationConfig::default(),
            &mut delay,
        ))
        .unwrap();

        assert_eq!(address, Ipv4Addr::new(192, 168, 1, 42));
        assert_eq!(link.ssid(), Some("lab"));
        assert_eq!(clock.now().as_millis(), 300);
    }

    #[test]
    fn gives_up_after_bounded_polls() {
        let clock = SimClock::new();
        let mut delay = clock.delay();
        let mut link = FakeWifi::never();
        let association = AssociationConfig {
            max_polls: 10,
            poll_interval_ms: 100,
        };

        let result = block_on(connect(
            &mut link,
            &InternetConfig::default(),
            &association,
            &mut delay,
        ));

        assert_eq!(result, Err(NetworkError::Association { polls: 10 }));
        assert_eq!(clock.now().as_millis(), 1000);
    }
}
