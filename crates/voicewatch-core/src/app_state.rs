//! Application-wide state and error types for voicewatch

use log::warn;
use thiserror_no_std::Error;

use crate::config::DeviceConfig;
use crate::gps::Position;
use crate::net::NetError;
use crate::sensors::SensorError;
use crate::serial::SerialError;

/// Process-wide context.
///
/// Built once at boot from the console configuration and handed to every
/// component that needs it; nothing here survives a restart.
#[derive(Debug)]
pub struct AppState {
    config: DeviceConfig,
    position: Position,
    ambient_noise_level: Option<f32>,
    /// Id of the next alert; starts at 1.
    alert_counter: u32,
    voice_detection_count: u32,
}

impl AppState {
    pub fn new(config: DeviceConfig) -> Self {
        Self {
            config,
            position: Position::default(),
            ambient_noise_level: None,
            alert_counter: 1,
            voice_detection_count: 0,
        }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn position_mut(&mut self) -> &mut Position {
        &mut self.position
    }

    /// Store the calibration baseline. Only the first value is kept.
    pub fn record_calibration(&mut self, baseline: f32) {
        if self.ambient_noise_level.is_some() {
            warn!("Noise baseline already set, ignoring {}", baseline);
            return;
        }
        self.ambient_noise_level = Some(baseline);
    }

    pub fn ambient_noise_level(&self) -> Option<f32> {
        self.ambient_noise_level
    }

    pub fn is_calibrated(&self) -> bool {
        self.ambient_noise_level.is_some()
    }

    pub fn next_alert_id(&self) -> u32 {
        self.alert_counter
    }

    /// Count one alert attempt, delivered or not.
    pub fn record_alert_attempt(&mut self) {
        self.alert_counter = self.alert_counter.saturating_add(1);
    }

    /// Alerts attempted since boot.
    pub fn alerts_attempted(&self) -> u32 {
        self.alert_counter - 1
    }

    /// Voice detections since boot. Nothing increments this yet.
    pub fn voice_detections(&self) -> u32 {
        self.voice_detection_count
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppError {
    #[error("Console error: {0}")]
    Serial(SerialError),
    #[error("Network error: {0}")]
    Net(NetError),
    #[error("Sensor error: {0}")]
    Sensor(SensorError),
}

impl From<SerialError> for AppError {
    fn from(value: SerialError) -> Self {
        Self::Serial(value)
    }
}

impl From<NetError> for AppError {
    fn from(value: NetError) -> Self {
        Self::Net(value)
    }
}

impl From<SensorError> for AppError {
    fn from(value: SensorError) -> Self {
        Self::Sensor(value)
    }
}
