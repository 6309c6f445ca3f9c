/// Distance sensor abstraction.
///
/// The monitoring loop only needs "give me a distance in centimetres", so the
/// hardware sits behind `DistanceSensor`. The HC-SR04 driver is written
/// against embedded-hal pin traits; `gpio` binds it to Raspberry Pi pins.

pub mod hcsr04;
#[cfg(feature = "rpi")]
pub mod gpio;

pub use hcsr04::{HcSr04, StdDelay};

use thiserror::Error;

/// Errors raised while taking a distance measurement.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SensorError {
    /// No echo edge inside the window for the sensor's maximum range.
    #[error("echo timed out")]
    Timeout,

    /// A trigger or echo line reported an I/O error.
    #[error("GPIO pin error: {0}")]
    Pin(String),

    /// The GPIO controller or a pin could not be acquired.
    #[error("sensor unavailable: {0}")]
    Unavailable(String),
}

impl SensorError {
    /// True for errors that only spoil the current sample.
    ///
    /// Anything else means the hardware is unusable and the loop must stop.
    pub fn is_invalid_sample(&self) -> bool {
        matches!(self, SensorError::Timeout)
    }
}

/// Port for a sensor measuring distance to a reflective surface.
pub trait DistanceSensor {
    /// Takes one raw measurement, in centimetres.
    fn measure_cm(&mut self) -> Result<f64, SensorError>;

    /// Upper bound of the sensor's range, in centimetres.
    fn max_distance_cm(&self) -> f64;

    /// Puts the hardware into an idle state before the handle is dropped.
    fn close(&mut self) {}
}
