//! WiFi station link over esp-radio.

use embassy_net::Stack;
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController};
use log::{debug, warn};
use voicewatch_core::net::{NetError, WifiLink};

/// Station-mode WiFi. Connected means associated with an IPv4 lease.
pub struct StationLink {
    controller: WifiController<'static>,
    stack: Stack<'static>,
}

impl StationLink {
    pub fn new(controller: WifiController<'static>, stack: Stack<'static>) -> Self {
        Self { controller, stack }
    }
}

impl WifiLink for StationLink {
    fn is_connected(&mut self) -> bool {
        matches!(self.controller.is_connected(), Ok(true)) && self.stack.is_config_up()
    }

    async fn begin(&mut self, ssid: &str, password: &str) -> Result<(), NetError> {
        let mode = ModeConfig::Client(
            ClientConfig::default()
                .with_ssid(ssid.into())
                .with_password(password.into()),
        );

        if matches!(self.controller.is_connected(), Ok(true)) {
            if let Err(e) = self.controller.disconnect_async().await {
                warn!("WiFi disconnect before reassociation failed: {:?}", e);
            }
        }

        self.controller.set_config(&mode).map_err(|e| {
            warn!("WiFi station config rejected: {:?}", e);
            NetError::Link("station config rejected")
        })?;

        if !matches!(self.controller.is_started(), Ok(true)) {
            self.controller.start_async().await.map_err(|e| {
                warn!("WiFi driver start failed: {:?}", e);
                NetError::Link("driver start failed")
            })?;
            debug!("WiFi driver started");
        }

        self.controller.connect().map_err(|e| {
            warn!("WiFi connect request failed: {:?}", e);
            NetError::Link("connect request failed")
        })
    }
}
