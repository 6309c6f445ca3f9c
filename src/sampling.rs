/// Sample collection and distance-to-level conversion.
///
/// A reading is built from a small burst of raw samples. Non-positive
/// samples and echo timeouts are sensor glitches and are dropped before
/// averaging; the level is then the mounted sensor height minus the average
/// distance, floored at zero.

use crate::sensor::{DistanceSensor, SensorError};
use std::thread;
use std::time::Duration;

/// One raw sample as the sensor reported it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawSample {
    Accepted(f64),
    /// Non-positive or non-finite distance.
    Rejected(f64),
    /// No echo came back.
    NoEcho,
}

/// Outcome of one burst of raw samples.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSet {
    /// Number of samples attempted.
    pub taken: usize,
    /// Samples that passed validation, in collection order.
    pub valid: Vec<f64>,
    /// Every sample, accepted or not, in collection order.
    pub raw: Vec<RawSample>,
}

impl SampleSet {
    /// Mean of the valid samples, or `None` if every sample was rejected.
    pub fn average(&self) -> Option<f64> {
        average_positive(&self.valid)
    }

    pub fn rejected(&self) -> usize {
        self.taken - self.valid.len()
    }
}

/// Takes `count` samples from `sensor`, sleeping `spacing` after each one.
///
/// # Errors
/// Only fatal sensor errors are returned. Timeouts and non-positive
/// distances are logged and left out of `SampleSet::valid`.
pub fn collect_samples<S: DistanceSensor + ?Sized>(
    sensor: &mut S,
    count: usize,
    spacing: Duration,
) -> Result<SampleSet, SensorError> {
    let mut valid = Vec::with_capacity(count);
    let mut raw = Vec::with_capacity(count);

    for i in 0..count {
        match sensor.measure_cm() {
            Ok(distance) if is_valid_distance(distance) => {
                valid.push(distance);
                raw.push(RawSample::Accepted(distance));
            }
            Ok(distance) => {
                log::debug!("Sample {}/{} rejected: {:.2} cm", i + 1, count, distance);
                raw.push(RawSample::Rejected(distance));
            }
            Err(e) if e.is_invalid_sample() => {
                log::debug!("Sample {}/{} rejected: {}", i + 1, count, e);
                raw.push(RawSample::NoEcho);
            }
            Err(e) => return Err(e),
        }

        if !spacing.is_zero() {
            thread::sleep(spacing);
        }
    }

    Ok(SampleSet { taken: count, valid, raw })
}

/// A raw distance is usable only when it is a positive, finite number.
pub fn is_valid_distance(distance_cm: f64) -> bool {
    distance_cm.is_finite() && distance_cm > 0.0
}

/// Arithmetic mean of the positive values in `samples`.
///
/// Returns `None` when no value is positive.
pub fn average_positive(samples: &[f64]) -> Option<f64> {
    let (sum, n) = samples
        .iter()
        .copied()
        .filter(|&d| is_valid_distance(d))
        .fold((0.0, 0usize), |(sum, n), d| (sum + d, n + 1));

    if n == 0 {
        None
    } else {
        Some(sum / n as f64)
    }
}

/// Water level above ground for a sensor mounted `mounted_height_cm` up
/// that sees the surface `distance_cm` away. Never negative.
pub fn water_level_cm(mounted_height_cm: f64, distance_cm: f64) -> f64 {
    (mounted_height_cm - distance_cm).max(0.0)
}
