/// Raspberry Pi GPIO binding for the HC-SR04 driver (BCM pin numbering).

use crate::sensor::{HcSr04, SensorError, StdDelay};
use rppal::gpio::{Gpio, InputPin, OutputPin};

/// HC-SR04 wired to two Raspberry Pi GPIO lines.
pub type GpioHcSr04 = HcSr04<OutputPin, InputPin, StdDelay>;

/// Claims the trigger and echo pins and builds the driver.
///
/// The trigger starts low. Both pins are reset to their previous mode when
/// the returned sensor is dropped.
pub fn open(trigger_pin: u8, echo_pin: u8, max_distance_cm: f64) -> Result<GpioHcSr04, SensorError> {
    let gpio = Gpio::new()
        .map_err(|e| SensorError::Unavailable(format!("GPIO controller: {}", e)))?;

    let trigger = gpio
        .get(trigger_pin)
        .map_err(|e| SensorError::Unavailable(format!("trigger pin {}: {}", trigger_pin, e)))?
        .into_output_low();

    let echo = gpio
        .get(echo_pin)
        .map_err(|e| SensorError::Unavailable(format!("echo pin {}: {}", echo_pin, e)))?
        .into_input();

    log::debug!("Claimed GPIO pins TRIG={} ECHO={}", trigger_pin, echo_pin);

    Ok(HcSr04::new(trigger, echo, StdDelay, max_distance_cm))
}
