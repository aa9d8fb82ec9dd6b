//! Threat detection sources.
//!
//! The device has no real audio classifier yet. [`SimulatedThreatSource`]
//! stands in for one by drawing a random catalog entry and a random
//! confidence score; it decides nothing about the actual acoustic scene and
//! must be replaced by a real [`ThreatSource`] before the device is relied
//! upon for detection.

use core::ops::RangeInclusive;

use log::info;
use rand::{Rng, RngCore};

/// One recognisable threat: the spoken keyword and the threat class it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub keyword: &'static str,
    pub threat_type: &'static str,
}

pub const CATALOG: [CatalogEntry; 3] = [
    CatalogEntry {
        keyword: "danger",
        threat_type: "danger_alert",
    },
    CatalogEntry {
        keyword: "fire",
        threat_type: "fire_emergency",
    },
    CatalogEntry {
        keyword: "snake",
        threat_type: "snake_attack",
    },
];

/// Confidence scores reported by the simulator, in percent.
pub const SIMULATED_CONFIDENCE: RangeInclusive<u8> = 85..=95;

/// A classifier verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    pub keyword: &'static str,
    pub threat_type: &'static str,
    /// Classifier certainty, 0–100.
    pub confidence: u8,
}

/// Anything that can be asked whether a threat was heard since the last poll.
pub trait ThreatSource {
    fn poll_detection(&mut self) -> Option<Detection>;
}

/// Random stand-in classifier: every poll yields exactly one detection.
pub struct SimulatedThreatSource<R> {
    rng: R,
}

impl<R: RngCore> SimulatedThreatSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: RngCore> ThreatSource for SimulatedThreatSource<R> {
    fn poll_detection(&mut self) -> Option<Detection> {
        let entry = CATALOG[self.rng.gen_range(0..CATALOG.len())];
        let confidence = self.rng.gen_range(SIMULATED_CONFIDENCE);

        info!(
            "Simulated detection: '{}' ({}) at {}%",
            entry.keyword, entry.threat_type, confidence
        );

        Some(Detection {
            keyword: entry.keyword,
            threat_type: entry.threat_type,
            confidence,
        })
    }
}
