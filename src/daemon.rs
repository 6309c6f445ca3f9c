/// Core monitoring loop for the water level sensor.
///
/// Each cycle:
/// 1. Takes a burst of raw distance samples
/// 2. Averages the valid ones and converts to a water level
/// 3. Uploads one reading (failures are logged, never retried)
///
/// Cycles repeat on a fixed cadence until the shutdown flag is raised or the
/// sensor reports a hardware fault. The sensor is closed on every exit path.

use crate::config::MonitorConfig;
use crate::model::WaterReading;
use crate::sampling::{self, SampleSet};
use crate::sensor::{DistanceSensor, SensorError};
use crate::upload::ReadingSink;
use chrono::Local;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Longest single sleep between shutdown checks.
const SHUTDOWN_POLL: Duration = Duration::from_millis(250);

// ---------------------------------------------------------------------------
// Cycle results
// ---------------------------------------------------------------------------

/// What one pass through the loop did.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Reading built and accepted by the sink.
    Uploaded(WaterReading),
    /// Reading built but the sink returned an error.
    UploadFailed(WaterReading),
    /// Every sample was rejected; nothing was uploaded.
    NoValidSamples,
}

/// Running totals, logged on shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub cycles: u64,
    pub uploaded: u64,
    pub upload_failures: u64,
    pub skipped: u64,
}

impl CycleStats {
    fn record(&mut self, outcome: &CycleOutcome) {
        self.cycles += 1;
        match outcome {
            CycleOutcome::Uploaded(_) => self.uploaded += 1,
            CycleOutcome::UploadFailed(_) => self.upload_failures += 1,
            CycleOutcome::NoValidSamples => self.skipped += 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

pub struct Monitor<S, U> {
    config: MonitorConfig,
    sensor: S,
    sink: U,
    stats: CycleStats,
}

impl<S: DistanceSensor, U: ReadingSink> Monitor<S, U> {
    pub fn new(config: MonitorConfig, sensor: S, sink: U) -> Self {
        Self {
            config,
            sensor,
            sink,
            stats: CycleStats::default(),
        }
    }

    pub fn stats(&self) -> CycleStats {
        self.stats
    }

    /// Gives the sensor back, e.g. for a final check in tests.
    pub fn into_sensor(self) -> S {
        self.sensor
    }

    /// Samples the sensor without uploading anything.
    pub fn sample(&mut self) -> Result<SampleSet, SensorError> {
        sampling::collect_samples(
            &mut self.sensor,
            self.config.samples_per_reading,
            self.config.sample_spacing(),
        )
    }

    /// Runs one sample-average-upload pass.
    ///
    /// # Errors
    /// Only fatal sensor errors. Upload failures are reported through
    /// `CycleOutcome::UploadFailed`.
    pub fn run_cycle(&mut self) -> Result<CycleOutcome, SensorError> {
        let samples = self.sample()?;

        let outcome = match samples.average() {
            None => {
                log::warn!("No valid readings obtained ({} samples rejected)", samples.rejected());
                CycleOutcome::NoValidSamples
            }
            Some(distance) => {
                let level = sampling::water_level_cm(self.config.sensor_height_cm, distance);

                log::info!("[{}]", Local::now().format("%Y-%m-%d %H:%M:%S"));
                log::info!("  Distance to water: {:.2} cm", distance);
                log::info!("  Water level: {:.2} cm", level);

                let reading = WaterReading::new(level, &self.config.sensor_id);
                match self.sink.insert(&reading) {
                    Ok(()) => {
                        log::info!("Data sent successfully: level={} sensor_id={} timestamp={}",
                            reading.level, reading.sensor_id, reading.timestamp.to_rfc3339());
                        CycleOutcome::Uploaded(reading)
                    }
                    Err(e) => {
                        log::warn!("Error sending data to Supabase: {}", e);
                        CycleOutcome::UploadFailed(reading)
                    }
                }
            }
        };

        self.stats.record(&outcome);
        Ok(outcome)
    }

    /// Main loop. Returns when `shutdown` is set or the sensor faults.
    ///
    /// The sensor is closed before returning in both cases.
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<CycleStats, SensorError> {
        log::info!("Water level monitoring started");
        log::info!("  Using GPIO pins: TRIG={}, ECHO={}", self.config.trigger_pin, self.config.echo_pin);
        log::info!("  Sensor height from ground: {} cm", self.config.sensor_height_cm);
        log::info!("  Sensor range: up to {} cm", self.sensor.max_distance_cm());
        log::info!("  {} samples every {} s", self.config.samples_per_reading, self.config.report_interval_secs);

        let result = self.run_loop(shutdown);

        self.sensor.close();
        log::info!("Sensor cleanup complete");

        let stats = self.stats;
        log::info!("{} cycles: {} uploaded, {} upload failures, {} without valid samples",
            stats.cycles, stats.uploaded, stats.upload_failures, stats.skipped);

        result.map(|()| stats)
    }

    fn run_loop(&mut self, shutdown: &AtomicBool) -> Result<(), SensorError> {
        while !shutdown.load(Ordering::SeqCst) {
            let start = Instant::now();

            self.run_cycle()?;

            let remaining = self.config.report_interval().saturating_sub(start.elapsed());
            sleep_unless_shutdown(remaining, shutdown);
        }

        log::info!("Monitoring stopped");
        Ok(())
    }
}

/// Sleeps for `total` in short slices, returning early once `shutdown` is set.
pub fn sleep_unless_shutdown(total: Duration, shutdown: &AtomicBool) {
    let deadline = Instant::now() + total;
    loop {
        if shutdown.load(Ordering::SeqCst) {
            return;
        }
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            return;
        }
        thread::sleep(left.min(SHUTDOWN_POLL));
    }
}
