//! On-demand status dump printed on the console.

use alloc::string::ToString;
use core::fmt;

use embassy_time::Instant;
use embedded_io_async::Write;

use crate::app_state::AppState;
use crate::gps::Position;
use crate::serial::{SerialError, write_str};

/// Console byte requesting a status dump, matched case-insensitively.
pub const STATUS_COMMAND: u8 = b's';

pub fn is_status_command(byte: u8) -> bool {
    byte.eq_ignore_ascii_case(&STATUS_COMMAND)
}

/// Snapshot of what the status command prints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusReport {
    pub uptime_secs: u64,
    pub alerts_attempted: u32,
    pub voice_detections: u32,
    pub wifi_connected: bool,
    pub position: Position,
}

impl StatusReport {
    pub fn capture(state: &AppState, wifi_connected: bool) -> Self {
        Self {
            uptime_secs: Instant::now().as_secs(),
            alerts_attempted: state.alerts_attempted(),
            voice_detections: state.voice_detections(),
            wifi_connected,
            position: *state.position(),
        }
    }

    pub async fn write_to<W: Write>(&self, console: &mut W) -> Result<(), SerialError> {
        write_str(console, &self.to_string()).await
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Uptime: {} sec", self.uptime_secs)?;
        writeln!(f, "Emergency Alerts: {}", self.alerts_attempted)?;
        writeln!(f, "Voice Detections: {}", self.voice_detections)?;
        writeln!(
            f,
            "WiFi: {}",
            if self.wifi_connected {
                "Connected"
            } else {
                "Offline"
            }
        )?;
        writeln!(
            f,
            "GPS: {} ({:.6}, {:.6})",
            if self.position.lock_acquired {
                "LOCKED"
            } else {
                "ACQUIRING"
            },
            self.position.latitude,
            self.position.longitude
        )
    }
}
