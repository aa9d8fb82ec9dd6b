//! Hardware-independent core library for voicewatch
//!
//! This crate contains all platform-agnostic logic of the emergency alert
//! device: configuration intake, GPS tracking, microphone calibration, the
//! threat source, the alert dispatcher, the status report and the supervisor
//! loop tying them together. Hardware is reached through small traits
//! (serial byte sources, analog input, WiFi link, TLS transport).
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both the
//! ESP32 firmware and desktop hosts (for the simulator and tests).

#![no_std]

extern crate alloc;

pub mod alert;
pub mod app_state;
pub mod config;
pub mod constants;
pub mod gps;
pub mod net;
pub mod sensors;
pub mod serial;
pub mod status;
pub mod supervisor;
pub mod threat;

#[cfg(test)]
mod testing;
