//! Ambient noise calibration and periodic microphone sampling.
//!
//! The calibrated baseline and the periodic sample are the hook for a future
//! threshold decision; today nothing acts on the sampled level.

use embassy_time::{Duration, Instant, Timer};
use log::{debug, info};

use super::{AnalogInput, SensorError};

/// Average the input over `window`, sampling every `period`.
///
/// Blocks the caller for the whole window. The mean uses integer division of
/// the integer sum, so the baseline is always a whole number of ADC counts.
pub async fn calibrate<A: AnalogInput>(
    input: &mut A,
    window: Duration,
    period: Duration,
) -> Result<f32, SensorError> {
    let started = Instant::now();
    let mut total: u64 = 0;
    let mut samples: u64 = 0;

    while started.elapsed() < window {
        total += u64::from(input.read().await?);
        samples += 1;
        Timer::after(period).await;
    }

    if samples == 0 {
        return Err(SensorError::NoSamples {
            sensor: "microphone",
        });
    }

    let baseline = (total / samples) as f32;
    info!(
        "Noise calibration: baseline {} from {} samples",
        baseline, samples
    );

    Ok(baseline)
}

/// Take a single reading, but only once a baseline exists.
///
/// Returns `Ok(None)` without touching the input while uncalibrated.
pub async fn sample_if_calibrated<A: AnalogInput>(
    input: &mut A,
    baseline: Option<f32>,
) -> Result<Option<u16>, SensorError> {
    let Some(baseline) = baseline else {
        return Ok(None);
    };

    let level = input.read().await?;
    debug!("Microphone level {} (baseline {})", level, baseline);

    Ok(Some(level))
}
