//! GPS position tracking from a streaming NMEA 0183 feed.
//!
//! Bytes are assembled into sentences here; decoding is left to the `nmea`
//! crate. Only GGA and RMC sentences carry a position we act upon.

use heapless::Vec;
use log::{debug, info};
use nmea::ParseResult;
use nmea::sentences::FixType;
use nmea::sentences::rmc::RmcStatusOfFix;

use crate::serial::ByteSource;

/// NMEA caps sentences at 82 characters; leave room for chatty receivers.
const MAX_SENTENCE_LEN: usize = 128;

/// Last known position of the device.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    /// Set by the first valid fix and never cleared, so a stale position is
    /// still reported after the receiver loses the sky.
    pub lock_acquired: bool,
}

impl Position {
    /// Record a valid fix.
    pub fn record_fix(&mut self, latitude: f64, longitude: f64) {
        if !self.lock_acquired {
            info!("GPS lock acquired at ({:.6}, {:.6})", latitude, longitude);
        }
        self.latitude = latitude;
        self.longitude = longitude;
        self.lock_acquired = true;
    }
}

/// Incremental NMEA sentence assembler.
pub struct GpsTracker {
    sentence: Vec<u8, MAX_SENTENCE_LEN>,
    overflowed: bool,
}

impl Default for GpsTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl GpsTracker {
    pub const fn new() -> Self {
        Self {
            sentence: Vec::new(),
            overflowed: false,
        }
    }

    /// Drain every byte currently buffered by `source`.
    ///
    /// Never waits. Returns `true` if at least one valid fix was recorded.
    pub fn drain<S: ByteSource>(&mut self, source: &mut S, position: &mut Position) -> bool {
        let mut updated = false;
        while let Some(byte) = source.try_read_byte() {
            updated |= self.encode(byte, position);
        }
        updated
    }

    /// Feed a single byte.
    ///
    /// Returns `true` when this byte completed a sentence carrying a valid
    /// fix, in which case `position` has been overwritten.
    pub fn encode(&mut self, byte: u8, position: &mut Position) -> bool {
        match byte {
            b'$' => {
                self.reset();
                // Cannot fail on an empty buffer.
                let _ = self.sentence.push(byte);
                false
            }
            b'\r' | b'\n' => {
                if self.sentence.is_empty() {
                    return false;
                }
                let fix = self.decode();
                self.reset();

                match fix {
                    Some((latitude, longitude)) => {
                        position.record_fix(latitude, longitude);
                        true
                    }
                    None => false,
                }
            }
            _ => {
                // Bytes before the first '$' are line noise.
                if !self.sentence.is_empty() && self.sentence.push(byte).is_err() {
                    self.overflowed = true;
                }
                false
            }
        }
    }

    fn reset(&mut self) {
        self.sentence.clear();
        self.overflowed = false;
    }

    fn decode(&self) -> Option<(f64, f64)> {
        if self.overflowed {
            debug!("Dropping over-long NMEA sentence");
            return None;
        }

        let text = core::str::from_utf8(&self.sentence).ok()?;
        match nmea::parse_str(text) {
            Ok(ParseResult::GGA(gga)) => {
                // Estimated, manual and simulated fixes count too.
                if gga.fix_type.is_some_and(|fix| fix != FixType::Invalid) {
                    Some((gga.latitude?, gga.longitude?))
                } else {
                    None
                }
            }
            Ok(ParseResult::RMC(rmc)) => match rmc.status_of_fix {
                RmcStatusOfFix::Invalid => None,
                _ => Some((rmc.lat?, rmc.lon?)),
            },
            Ok(_) => None,
            Err(e) => {
                debug!("Unparsed NMEA sentence {:?}: {:?}", text, e);
                None
            }
        }
    }
}
