/// HC-SR04 ultrasonic ranger driver.
///
/// Measurement cycle:
///   1. trigger low 2 µs, high 10 µs, low
///   2. wait for echo to rise
///   3. time how long echo stays high
///
/// The echo pulse width is the round trip time of the ping, so
/// `distance = width * speed_of_sound / 2`. With no target in range the
/// module holds echo high for ~38 ms; any pulse past `max_distance_cm`
/// (including one still high after `ECHO_PULSE_WINDOW`) reads as the max.

use crate::model::SPEED_OF_SOUND_M_PER_S;
use crate::sensor::{DistanceSensor, SensorError};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use std::time::{Duration, Instant};

/// Slack added to the round trip time before waiting for the echo to rise gives up.
const ECHO_TIMEOUT_MARGIN: Duration = Duration::from_millis(10);

/// Longest echo pulse waited for once it has started.
pub const ECHO_PULSE_WINDOW: Duration = Duration::from_millis(100);

pub struct HcSr04<T, E, D> {
    trigger: T,
    echo: E,
    delay: D,
    max_distance_cm: f64,
    rise_timeout: Duration,
}

impl<T, E, D> HcSr04<T, E, D>
where
    T: OutputPin,
    E: InputPin,
    D: DelayNs,
{
    pub fn new(trigger: T, echo: E, delay: D, max_distance_cm: f64) -> Self {
        Self {
            trigger,
            echo,
            delay,
            max_distance_cm,
            rise_timeout: round_trip_time(max_distance_cm).saturating_add(ECHO_TIMEOUT_MARGIN),
        }
    }

    fn pulse_trigger(&mut self) -> Result<(), SensorError> {
        self.trigger.set_low().map_err(pin_error)?;
        self.delay.delay_us(2);
        self.trigger.set_high().map_err(pin_error)?;
        self.delay.delay_us(10);
        self.trigger.set_low().map_err(pin_error)
    }

    /// Spins until echo reads `level`, returning the instant it did, or
    /// `None` once `window` has passed.
    fn wait_for_echo(&mut self, level: bool, window: Duration) -> Result<Option<Instant>, SensorError> {
        let start = Instant::now();
        loop {
            if self.echo.is_high().map_err(pin_error)? == level {
                return Ok(Some(Instant::now()));
            }
            if start.elapsed() > window {
                return Ok(None);
            }
        }
    }
}

impl<T, E, D> DistanceSensor for HcSr04<T, E, D>
where
    T: OutputPin,
    E: InputPin,
    D: DelayNs,
{
    fn measure_cm(&mut self) -> Result<f64, SensorError> {
        self.pulse_trigger()?;
        let rise = self
            .wait_for_echo(true, self.rise_timeout)?
            .ok_or(SensorError::Timeout)?;

        match self.wait_for_echo(false, ECHO_PULSE_WINDOW)? {
            Some(fall) => {
                let distance = pulse_to_distance_cm(fall.duration_since(rise));
                Ok(distance.min(self.max_distance_cm))
            }
            None => Ok(self.max_distance_cm),
        }
    }

    fn max_distance_cm(&self) -> f64 {
        self.max_distance_cm
    }

    fn close(&mut self) {
        if self.trigger.set_low().is_err() {
            log::warn!("Could not drive trigger low during sensor close");
        }
    }
}

/// Converts an echo pulse width to a one-way distance in centimetres.
pub fn pulse_to_distance_cm(pulse: Duration) -> f64 {
    pulse.as_secs_f64() * SPEED_OF_SOUND_M_PER_S * 100.0 / 2.0
}

/// Time for a ping to travel `distance_cm` and back, saturating at `Duration::MAX`.
pub fn round_trip_time(distance_cm: f64) -> Duration {
    let secs = (distance_cm.max(0.0) * 2.0) / (SPEED_OF_SOUND_M_PER_S * 100.0);
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

fn pin_error<Err: core::fmt::Debug>(e: Err) -> SensorError {
    SensorError::Pin(format!("{:?}", e))
}

// ---------------------------------------------------------------------------
// Delay
// ---------------------------------------------------------------------------

/// `DelayNs` backed by `std::thread::sleep`.
///
/// Trigger pulses only need a lower bound on width, so oversleeping is fine.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(ns as u64));
    }
}
