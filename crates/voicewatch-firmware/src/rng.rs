//! `rand` adapter for the ESP32 hardware RNG.

use esp_hal::rng::Rng;
use rand::{CryptoRng, RngCore};

/// Hardware random numbers. Entropy is only true-random while the radio is
/// running, which is the case on this device from boot.
#[derive(Clone, Copy)]
pub struct HwRng(Rng);

impl HwRng {
    pub fn new() -> Self {
        Self(Rng::new())
    }
}

impl Default for HwRng {
    fn default() -> Self {
        Self::new()
    }
}

impl RngCore for HwRng {
    fn next_u32(&mut self) -> u32 {
        self.0.random()
    }

    fn next_u64(&mut self) -> u64 {
        (u64::from(self.next_u32()) << 32) | u64::from(self.next_u32())
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let word = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&word[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl CryptoRng for HwRng {}
