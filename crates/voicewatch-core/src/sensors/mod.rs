pub mod noise;

use thiserror_no_std::Error;

pub use noise::{calibrate, sample_if_calibrated};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("{sensor}: {operation} failed")]
    ReadFailed {
        sensor: &'static str,
        operation: &'static str,
    },
    #[error("{sensor}: no samples collected")]
    NoSamples { sensor: &'static str },
}

/// Trait for single-channel analog inputs such as the microphone.
pub trait AnalogInput {
    /// Take one raw ADC reading.
    fn read(&mut self) -> impl Future<Output = Result<u16, SensorError>>;
}
