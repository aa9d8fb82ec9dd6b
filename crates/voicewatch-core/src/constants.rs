//! Timing, network and threshold constants for the device.

use embassy_time::Duration;

/// Pause at the end of every supervisor loop iteration.
pub const LOOP_PERIOD: Duration = Duration::from_millis(100);

/// Minimum time between two microphone samples once calibrated.
pub const VOICE_CHECK_INTERVAL: Duration = Duration::from_millis(3000);

/// Time between two simulated emergency detections.
pub const EMERGENCY_INTERVAL: Duration = Duration::from_millis(50_000);

/// Length of the ambient noise calibration window at boot.
pub const CALIBRATION_WINDOW: Duration = Duration::from_millis(3000);

/// Delay between two samples inside the calibration window.
pub const CALIBRATION_SAMPLE_PERIOD: Duration = Duration::from_millis(50);

/// Number of times the boot sequence polls the WiFi link (15 s in total).
pub const WIFI_CONNECT_ATTEMPTS: u32 = 30;

/// Delay between two WiFi link polls at boot.
pub const WIFI_CONNECT_POLL_PERIOD: Duration = Duration::from_millis(500);

/// Pause after kicking off a WiFi reconnection following an alert.
pub const WIFI_RECONNECT_PAUSE: Duration = Duration::from_millis(2000);

/// Port of the alert endpoint.
pub const HTTPS_PORT: u16 = 443;

/// How long to wait for the alert endpoint's response after the request is written.
pub const RESPONSE_TIMEOUT: Duration = Duration::from_millis(10_000);

/// REST table receiving emergency alerts.
pub const ALERT_PATH: &str = "/rest/v1/emergency_alerts";

/// Raw ADC counts above the calibrated baseline that mark voice activity.
/// Not consulted yet.
pub const NOISE_THRESHOLD: u16 = 100;
/// Raw ADC counts above the calibrated baseline that mark an emergency.
/// Not consulted yet.
pub const EMERGENCY_THRESHOLD: u16 = 400;
/// Minimum classifier confidence (percent) for a detection to count.
/// Not consulted yet.
pub const CONFIDENCE_THRESHOLD: u8 = 75;
