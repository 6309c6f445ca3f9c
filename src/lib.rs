/// wlmon_sensor: open-water level sensor service for a Raspberry Pi.
///
/// # Module structure
///
/// ```text
/// wlmon_sensor
/// ├── model     — WaterReading record, level rounding, physical constants
/// ├── config    — compile-time defaults, sensor.toml overrides, Supabase credentials
/// ├── sensor    — DistanceSensor port
/// │   ├── hcsr04 — HC-SR04 driver over embedded-hal pins
/// │   └── gpio   — Raspberry Pi pin binding (feature "rpi")
/// ├── sampling  — sample bursts, positive-only averaging, level conversion
/// ├── upload    — ReadingSink port
/// │   └── supabase — PostgREST insert client
/// └── daemon    — monitoring loop (cycle, cadence, shutdown, sensor release)
/// ```

pub mod config;
pub mod daemon;
pub mod model;
pub mod sampling;
pub mod sensor;
pub mod upload;
