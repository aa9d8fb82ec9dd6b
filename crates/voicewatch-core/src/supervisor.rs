//! Boot sequence and the cooperative poll loop.
//!
//! The supervisor is the only task doing application work. Each loop
//! iteration drains the GPS receiver, samples the microphone when due, runs
//! the threat source when due, answers one console command and sleeps.
//! Anything slow inside an iteration (an alert waiting on its response, a
//! WiFi reconnect pause) delays everything behind it.

use embassy_time::{Duration, Instant, Timer};
use embedded_io_async::{Read, Write};
use log::{error, info, warn};

use crate::alert::{ALERT_STATUS, AlertDispatcher, AlertEvent};
use crate::app_state::{AppError, AppState};
use crate::config::DeviceConfig;
use crate::constants;
use crate::gps::GpsTracker;
use crate::net::{Transport, WifiLink};
use crate::sensors::{AnalogInput, calibrate, sample_if_calibrated};
use crate::serial::{ByteSource, SerialError};
use crate::status::{StatusReport, is_status_command};
use crate::threat::{Detection, ThreatSource};

/// Every delay and interval the supervisor uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub loop_period: Duration,
    pub voice_check_interval: Duration,
    pub emergency_interval: Duration,
    pub calibration_window: Duration,
    pub calibration_sample_period: Duration,
    pub wifi_connect_attempts: u32,
    pub wifi_connect_poll_period: Duration,
    pub wifi_reconnect_pause: Duration,
    pub response_timeout: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            loop_period: constants::LOOP_PERIOD,
            voice_check_interval: constants::VOICE_CHECK_INTERVAL,
            emergency_interval: constants::EMERGENCY_INTERVAL,
            calibration_window: constants::CALIBRATION_WINDOW,
            calibration_sample_period: constants::CALIBRATION_SAMPLE_PERIOD,
            wifi_connect_attempts: constants::WIFI_CONNECT_ATTEMPTS,
            wifi_connect_poll_period: constants::WIFI_CONNECT_POLL_PERIOD,
            wifi_reconnect_pause: constants::WIFI_RECONNECT_PAUSE,
            response_timeout: constants::RESPONSE_TIMEOUT,
        }
    }
}

/// Hardware handed to the supervisor at boot.
pub struct Devices<C, G, M, W, T, S> {
    /// Operator console: config prompts, status command and status output.
    pub console: C,
    /// GPS receiver UART.
    pub gps_uart: G,
    pub microphone: M,
    pub wifi: W,
    /// Secure transport to the alert endpoint.
    pub transport: T,
    pub threats: S,
}

pub struct Supervisor<C, G, M, W, T, S> {
    state: AppState,
    console: C,
    gps_uart: G,
    gps: GpsTracker,
    microphone: M,
    wifi: W,
    dispatcher: AlertDispatcher<T>,
    threats: S,
    timings: Timings,
    last_voice_check: Instant,
    last_alert: Instant,
}

impl<C, G, M, W, T, S> Supervisor<C, G, M, W, T, S>
where
    C: Read + Write + ByteSource,
    G: ByteSource,
    M: AnalogInput,
    W: WifiLink,
    T: Transport,
    S: ThreatSource,
{
    /// Assemble a supervisor around an existing state, skipping boot.
    pub fn new(state: AppState, devices: Devices<C, G, M, W, T, S>, timings: Timings) -> Self {
        let Devices {
            console,
            gps_uart,
            microphone,
            wifi,
            transport,
            threats,
        } = devices;

        Self {
            state,
            console,
            gps_uart,
            gps: GpsTracker::new(),
            microphone,
            wifi,
            dispatcher: AlertDispatcher::new(transport, timings.response_timeout),
            threats,
            timings,
            // Both schedules count from boot, not from the end of setup.
            last_voice_check: Instant::from_ticks(0),
            last_alert: Instant::from_ticks(0),
        }
    }

    /// Run the boot sequence: configuration, WiFi, noise calibration.
    ///
    /// Only a console failure aborts boot. An unreachable network or a
    /// failed calibration is logged and the device carries on without it.
    pub async fn boot(
        mut devices: Devices<C, G, M, W, T, S>,
        timings: Timings,
    ) -> Result<Self, AppError> {
        let config = DeviceConfig::request(&mut devices.console).await?;
        let mut state = AppState::new(config);

        connect_wifi(&mut devices.wifi, state.config(), &timings).await;

        info!("Calibrating ambient noise level");
        match calibrate(
            &mut devices.microphone,
            timings.calibration_window,
            timings.calibration_sample_period,
        )
        .await
        {
            Ok(baseline) => state.record_calibration(baseline),
            Err(e) => error!("Noise calibration failed: {}", e),
        }

        info!("Boot complete");
        Ok(Self::new(state, devices, timings))
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn console_mut(&mut self) -> &mut C {
        &mut self.console
    }

    pub fn gps_uart_mut(&mut self) -> &mut G {
        &mut self.gps_uart
    }

    pub fn microphone(&self) -> &M {
        &self.microphone
    }

    pub fn wifi(&self) -> &W {
        &self.wifi
    }

    pub fn wifi_mut(&mut self) -> &mut W {
        &mut self.wifi
    }

    pub fn transport(&self) -> &T {
        self.dispatcher.transport()
    }

    pub fn transport_mut(&mut self) -> &mut T {
        self.dispatcher.transport_mut()
    }

    /// Loop forever.
    pub async fn run(mut self) -> ! {
        loop {
            self.tick().await;
            Timer::after(self.timings.loop_period).await;
        }
    }

    /// One loop iteration, without the trailing pause.
    pub async fn tick(&mut self) {
        self.gps.drain(&mut self.gps_uart, self.state.position_mut());

        if self.last_voice_check.elapsed() > self.timings.voice_check_interval {
            self.check_voice_activity().await;
            self.last_voice_check = Instant::now();
        }

        if self.last_alert.elapsed() >= self.timings.emergency_interval {
            if let Some(detection) = self.threats.poll_detection() {
                self.trigger_alert(detection).await;
            }
            self.last_alert = Instant::now();
        }

        if let Err(e) = self.poll_command().await {
            warn!("Console command failed: {}", e);
        }
    }

    /// Sample the microphone if calibrated. The level is not acted upon.
    pub async fn check_voice_activity(&mut self) -> Option<u16> {
        match sample_if_calibrated(&mut self.microphone, self.state.ambient_noise_level()).await {
            Ok(level) => level,
            Err(e) => {
                warn!("Microphone sample failed: {}", e);
                None
            }
        }
    }

    /// Raise and post an alert for `detection`.
    ///
    /// The send is tried first whatever the link state; afterwards, if WiFi
    /// is down, a reconnection is started and the loop pauses. The alert
    /// counter moves on whether or not the endpoint accepted the alert.
    /// Returns whether it did.
    pub async fn trigger_alert(&mut self, detection: Detection) -> bool {
        let event = AlertEvent {
            sequence: self.state.next_alert_id(),
            keyword: detection.keyword,
            threat_type: detection.threat_type,
            confidence: detection.confidence,
            position: *self.state.position(),
        };
        info!(
            "Alert #{}: '{}' ({}, {}% confidence)",
            event.sequence, event.keyword, event.threat_type, event.confidence
        );

        let delivered = match self
            .dispatcher
            .dispatch(self.state.config(), &event, ALERT_STATUS)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!("Alert #{} not delivered: {}", event.sequence, e);
                false
            }
        };

        if !self.wifi.is_connected() {
            info!("WiFi offline, reconnecting");
            let config = self.state.config();
            if let Err(e) = self
                .wifi
                .begin(&config.wifi_ssid, &config.wifi_password)
                .await
            {
                warn!("WiFi reconnect could not start: {}", e);
            }
            Timer::after(self.timings.wifi_reconnect_pause).await;
        }

        self.state.record_alert_attempt();
        delivered
    }

    /// Handle at most one pending console byte.
    pub async fn poll_command(&mut self) -> Result<(), SerialError> {
        let Some(byte) = self.console.try_read_byte() else {
            return Ok(());
        };

        if is_status_command(byte) {
            let report = StatusReport::capture(&self.state, self.wifi.is_connected());
            report.write_to(&mut self.console).await?;
        }

        Ok(())
    }
}

/// Start associating, then poll the link until it is up or attempts run out.
///
/// Returns the final link state; boot continues either way.
async fn connect_wifi<W: WifiLink>(wifi: &mut W, config: &DeviceConfig, timings: &Timings) -> bool {
    info!("Connecting to WiFi network '{}'", config.wifi_ssid);
    if let Err(e) = wifi.begin(&config.wifi_ssid, &config.wifi_password).await {
        warn!("WiFi association could not start: {}", e);
    }

    let mut attempts = 0;
    while !wifi.is_connected() && attempts < timings.wifi_connect_attempts {
        Timer::after(timings.wifi_connect_poll_period).await;
        attempts += 1;
    }

    let connected = wifi.is_connected();
    if connected {
        info!("WiFi connected");
    } else {
        warn!(
            "WiFi not connected after {} attempts, continuing offline",
            attempts
        );
    }
    connected
}
