//! ESP32 firmware-specific modules for voicewatch
//!
//! This crate contains the hardware side of the device: the UART console and
//! GPS receiver, the ADC microphone, the hardware RNG, the esp-radio WiFi
//! station and the TLS transport over embassy-net. Each type implements one
//! of the seams defined in `voicewatch_core`.

#![no_std]

extern crate alloc;

pub mod console;
pub mod hardware;
pub mod rng;
pub mod tls;
pub mod wifi;
