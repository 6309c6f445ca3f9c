/// Shared data types for the water level sensor service.
///
/// One `WaterReading` is built per reporting cycle, uploaded, and dropped.
/// Field names match the remote `water_readings` table columns.

use chrono::{DateTime, Local};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Physical constants
// ---------------------------------------------------------------------------

/// Speed of sound in dry air at ~20 °C, in metres per second.
pub const SPEED_OF_SOUND_M_PER_S: f64 = 343.26;

/// Decimal places kept on the reported level.
pub const LEVEL_DECIMAL_PLACES: u32 = 2;

// ---------------------------------------------------------------------------
// Reading record
// ---------------------------------------------------------------------------

/// A single water level report, as inserted into the remote table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterReading {
    /// Water level above the reference ground point, in centimetres.
    /// Always >= 0 and rounded to two decimal places.
    #[serde(with = "rust_decimal::serde::float")]
    pub level: Decimal,
    pub sensor_id: String,
    /// ISO 8601 with UTC offset, e.g. `2024-05-01T12:00:00.123456+07:00`.
    pub timestamp: DateTime<Local>,
}

impl WaterReading {
    /// Builds a reading stamped with the current local time.
    pub fn new(level_cm: f64, sensor_id: &str) -> Self {
        Self::at(level_cm, sensor_id, Local::now())
    }

    /// Builds a reading with an explicit timestamp.
    ///
    /// Negative or non-finite levels are reported as `0.00`.
    pub fn at(level_cm: f64, sensor_id: &str, timestamp: DateTime<Local>) -> Self {
        Self {
            level: round_level(level_cm),
            sensor_id: sensor_id.to_string(),
            timestamp,
        }
    }

    /// Level as a float, for logging and comparisons.
    pub fn level_cm(&self) -> f64 {
        self.level.to_f64().unwrap_or(0.0)
    }
}

/// Rounds a level to `LEVEL_DECIMAL_PLACES`, clamping at zero.
///
/// Rounds the exact binary value of the float, half to even, so
/// `2.675` (stored as 2.67499999...) gives `2.67`. Values too large for
/// `Decimal` saturate at `Decimal::MAX`.
pub fn round_level(level_cm: f64) -> Decimal {
    if !level_cm.is_finite() || level_cm <= 0.0 {
        return Decimal::ZERO;
    }
    Decimal::from_f64_retain(level_cm)
        .unwrap_or(Decimal::MAX)
        .round_dp(LEVEL_DECIMAL_PLACES)
}
