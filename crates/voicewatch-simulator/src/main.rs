//! Desktop simulator for the voicewatch emergency alert device.
//!
//! Runs the real supervisor from `voicewatch-core` against stand-ins for the
//! hardware: stdin/stdout as the operator console, a synthetic NMEA feed as
//! the GPS receiver, a noisy synthetic microphone, a WiFi link that comes up
//! a few polls after `begin`, and a loopback endpoint that accepts every
//! alert with `201 Created`.
//!
//! Answer the seven configuration prompts (or pipe them in), then press `s`
//! and Enter for a status report. Set `RUST_LOG=debug` to see the HTTP
//! request of each alert.

use std::collections::VecDeque;
use std::io::{BufRead, Write as _};
use std::sync::{Arc, Mutex};
use std::time::{Duration as StdDuration, Instant as StdInstant, SystemTime, UNIX_EPOCH};

use embassy_executor::Spawner;
use embassy_time::{Duration, Timer};
use embedded_io_async::{ErrorKind, ErrorType, Read, Write};
use log::{debug, error, info};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use voicewatch_core::net::{Connection, NetError, Transport, WifiLink};
use voicewatch_core::sensors::{AnalogInput, SensorError};
use voicewatch_core::serial::ByteSource;
use voicewatch_core::supervisor::{Devices, Supervisor, Timings};
use voicewatch_core::threat::SimulatedThreatSource;

// ---------------------------------------------------------------------------
// Simulation constants
// ---------------------------------------------------------------------------

/// Emergencies every 15 s instead of every 50 s, so something happens.
const SIM_EMERGENCY_INTERVAL: Duration = Duration::from_secs(15);

/// How often the console reader checks for new stdin bytes.
const CONSOLE_POLL: Duration = Duration::from_millis(20);

/// One NMEA sentence per second, like a real receiver.
const SENTENCE_INTERVAL: StdDuration = StdDuration::from_secs(1);

/// Sentences report no fix until this much time has passed.
const TIME_TO_FIRST_FIX: StdDuration = StdDuration::from_secs(8);

/// Centre of the simulated walk.
const HOME_LATITUDE: f64 = 48.1173;
const HOME_LONGITUDE: f64 = 11.5167;

/// Polls after `begin` before the simulated link reports connected.
const WIFI_POLLS_TO_CONNECT: u32 = 4;

// ---------------------------------------------------------------------------
// Console
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ConsoleInput {
    bytes: VecDeque<u8>,
    closed: bool,
}

/// stdin/stdout console. A reader thread moves stdin lines into a queue.
struct StdioConsole {
    input: Arc<Mutex<ConsoleInput>>,
}

impl StdioConsole {
    fn spawn() -> Self {
        let input = Arc::new(Mutex::new(ConsoleInput::default()));
        let feed = Arc::clone(&input);

        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                let Ok(mut input) = feed.lock() else { return };
                input.bytes.extend(line.bytes());
                input.bytes.push_back(b'\n');
            }
            if let Ok(mut input) = feed.lock() {
                input.closed = true;
            }
        });

        Self { input }
    }
}

impl ErrorType for StdioConsole {
    type Error = ErrorKind;
}

impl Read for StdioConsole {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        loop {
            {
                let mut input = self.input.lock().map_err(|_| ErrorKind::Other)?;
                if !input.bytes.is_empty() {
                    let count = buf.len().min(input.bytes.len());
                    for (slot, byte) in buf.iter_mut().zip(input.bytes.drain(..count)) {
                        *slot = byte;
                    }
                    return Ok(count);
                }
                if input.closed {
                    return Ok(0);
                }
            }
            Timer::after(CONSOLE_POLL).await;
        }
    }
}

impl Write for StdioConsole {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        std::io::stdout()
            .write_all(buf)
            .map_err(|_| ErrorKind::BrokenPipe)?;
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        std::io::stdout().flush().map_err(|_| ErrorKind::BrokenPipe)
    }
}

impl ByteSource for StdioConsole {
    fn try_read_byte(&mut self) -> Option<u8> {
        self.input.lock().ok()?.bytes.pop_front()
    }
}

// ---------------------------------------------------------------------------
// GPS feed
// ---------------------------------------------------------------------------

/// Emits `$GPGGA` sentences: no fix at first, then a slow random walk.
struct NmeaFeed {
    started: StdInstant,
    last_sentence: Option<StdInstant>,
    pending: VecDeque<u8>,
    latitude: f64,
    longitude: f64,
    rng: SmallRng,
}

impl NmeaFeed {
    fn new(rng: SmallRng) -> Self {
        Self {
            started: StdInstant::now(),
            last_sentence: None,
            pending: VecDeque::new(),
            latitude: HOME_LATITUDE,
            longitude: HOME_LONGITUDE,
            rng,
        }
    }

    fn queue_sentence(&mut self) {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let time = format!(
            "{:02}{:02}{:02}",
            (secs / 3600) % 24,
            (secs / 60) % 60,
            secs % 60
        );

        let body = if self.started.elapsed() < TIME_TO_FIRST_FIX {
            format!("GPGGA,{},,,,,0,00,99.99,,M,,M,,", time)
        } else {
            self.latitude += self.rng.gen_range(-0.0001..=0.0001);
            self.longitude += self.rng.gen_range(-0.0001..=0.0001);
            format!(
                "GPGGA,{},{},{},1,08,0.9,545.4,M,46.9,M,,",
                time,
                nmea_coordinate(self.latitude, 2, ['N', 'S']),
                nmea_coordinate(self.longitude, 3, ['E', 'W']),
            )
        };

        let sentence = format!("${}*{:02X}\r\n", body, nmea_checksum(&body));
        self.pending.extend(sentence.bytes());
        self.last_sentence = Some(StdInstant::now());
    }
}

impl ByteSource for NmeaFeed {
    fn try_read_byte(&mut self) -> Option<u8> {
        let due = self
            .last_sentence
            .is_none_or(|last| last.elapsed() >= SENTENCE_INTERVAL);
        if self.pending.is_empty() && due {
            self.queue_sentence();
        }
        self.pending.pop_front()
    }
}

/// `ddmm.mmmm,N` / `dddmm.mmmm,E` as used in GGA sentences.
fn nmea_coordinate(value: f64, degree_digits: usize, hemispheres: [char; 2]) -> String {
    let hemisphere = if value < 0.0 {
        hemispheres[1]
    } else {
        hemispheres[0]
    };
    let value = value.abs();
    let degrees = value.trunc();
    let minutes = (value - degrees) * 60.0;
    format!(
        "{:0width$}{:07.4},{}",
        degrees as u32,
        minutes,
        hemisphere,
        width = degree_digits
    )
}

fn nmea_checksum(body: &str) -> u8 {
    body.bytes().fold(0, |acc, byte| acc ^ byte)
}

// ---------------------------------------------------------------------------
// Microphone, WiFi, endpoint
// ---------------------------------------------------------------------------

/// Room noise around mid-scale of a 12-bit ADC.
struct SyntheticMicrophone {
    rng: SmallRng,
}

impl AnalogInput for SyntheticMicrophone {
    async fn read(&mut self) -> Result<u16, SensorError> {
        Ok(self.rng.gen_range(1700..=1900))
    }
}

#[derive(Default)]
struct SimulatedWifi {
    polls_until_up: Option<u32>,
}

impl WifiLink for SimulatedWifi {
    fn is_connected(&mut self) -> bool {
        match self.polls_until_up.as_mut() {
            Some(0) => true,
            Some(polls) => {
                *polls -= 1;
                false
            }
            None => false,
        }
    }

    async fn begin(&mut self, ssid: &str, _password: &str) -> Result<(), NetError> {
        info!("[wifi] associating with '{}'", ssid);
        self.polls_until_up = Some(WIFI_POLLS_TO_CONNECT);
        Ok(())
    }
}

/// Accepts every request with `201 Created`.
#[derive(Default)]
struct LoopbackEndpoint {
    received: u32,
}

struct LoopbackConnection<'a> {
    endpoint: &'a mut LoopbackEndpoint,
    host: String,
    request: Vec<u8>,
    response: VecDeque<u8>,
}

impl Transport for LoopbackEndpoint {
    type Connection<'a>
        = LoopbackConnection<'a>
    where
        Self: 'a;

    async fn connect(&mut self, host: &str, port: u16) -> Result<LoopbackConnection<'_>, NetError> {
        debug!("[endpoint] connection to {}:{}", host, port);
        Ok(LoopbackConnection {
            endpoint: self,
            host: host.to_string(),
            request: Vec::new(),
            response: b"HTTP/1.1 201 Created\r\nContent-Length: 0\r\n\r\n"
                .iter()
                .copied()
                .collect(),
        })
    }
}

impl Connection for LoopbackConnection<'_> {
    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), NetError> {
        self.request.extend_from_slice(bytes);
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, NetError> {
        let count = buf.len().min(self.response.len());
        for (slot, byte) in buf.iter_mut().zip(self.response.drain(..count)) {
            *slot = byte;
        }
        Ok(count)
    }

    async fn close(self) {
        self.endpoint.received += 1;
        info!(
            "[endpoint] {} received alert request #{} ({} bytes)",
            self.host,
            self.endpoint.received,
            self.request.len()
        );
        debug!("[endpoint] request:\n{}", String::from_utf8_lossy(&self.request));
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    env_logger::init();
    info!("Starting voicewatch simulator");
    info!("Emergency interval shortened to {} s", SIM_EMERGENCY_INTERVAL.as_secs());

    let mut seeds = SmallRng::seed_from_u64(seed());

    let devices = Devices {
        console: StdioConsole::spawn(),
        gps_uart: NmeaFeed::new(SmallRng::seed_from_u64(seeds.r#gen())),
        microphone: SyntheticMicrophone {
            rng: SmallRng::seed_from_u64(seeds.r#gen()),
        },
        wifi: SimulatedWifi::default(),
        transport: LoopbackEndpoint::default(),
        threats: SimulatedThreatSource::new(SmallRng::seed_from_u64(seeds.r#gen())),
    };

    let timings = Timings {
        emergency_interval: SIM_EMERGENCY_INTERVAL,
        ..Timings::default()
    };

    match Supervisor::boot(devices, timings).await {
        Ok(supervisor) => supervisor.run().await,
        Err(e) => error!("Boot failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_matches_reference_sentence() {
        let body = "GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,";
        assert_eq!(nmea_checksum(body), 0x47);
    }

    #[test]
    fn test_coordinates_use_degree_minute_layout() {
        assert_eq!(nmea_coordinate(48.1173, 2, ['N', 'S']), "4807.0380,N");
        assert_eq!(nmea_coordinate(-0.125, 3, ['E', 'W']), "00007.5000,W");
    }

    #[test]
    fn test_feed_sentences_parse_as_fixes() {
        let mut feed = NmeaFeed::new(SmallRng::seed_from_u64(7));
        feed.started -= TIME_TO_FIRST_FIX;

        let mut tracker = voicewatch_core::gps::GpsTracker::new();
        let mut position = voicewatch_core::gps::Position::default();
        tracker.drain(&mut feed, &mut position);

        assert!(position.lock_acquired);
        assert!((position.latitude - HOME_LATITUDE).abs() < 0.001);
        assert!((position.longitude - HOME_LONGITUDE).abs() < 0.001);
    }
}
