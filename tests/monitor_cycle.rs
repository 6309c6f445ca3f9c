/// Integration tests for the monitoring loop.
///
/// These drive `Monitor` with a scripted sensor and an in-memory sink to
/// check the reporting contract end to end:
/// 1. Averaging only positive samples
/// 2. Level = max(0, mounted height - distance), rounded to 2 dp
/// 3. No upload when every sample is invalid
/// 4. Upload failures never stop the loop
/// 5. Sensor release on shutdown and on hardware faults
/// 6. Cycle cadence measured from the start of each cycle
///
/// Run with: cargo test --test monitor_cycle

use rust_decimal::Decimal;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use wlmon_sensor::config::MonitorConfig;
use wlmon_sensor::daemon::{CycleOutcome, Monitor};
use wlmon_sensor::model::WaterReading;
use wlmon_sensor::sensor::{DistanceSensor, SensorError};
use wlmon_sensor::upload::{ReadingSink, UploadError};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

struct ScriptedSensor {
    script: VecDeque<Result<f64, SensorError>>,
    closed: Rc<RefCell<bool>>,
}

impl ScriptedSensor {
    fn distances(distances: &[f64]) -> Self {
        Self::script(distances.iter().map(|&d| Ok(d)).collect())
    }

    fn script(script: Vec<Result<f64, SensorError>>) -> Self {
        Self {
            script: script.into(),
            closed: Rc::new(RefCell::new(false)),
        }
    }
}

impl DistanceSensor for ScriptedSensor {
    fn measure_cm(&mut self) -> Result<f64, SensorError> {
        self.script.pop_front().unwrap_or(Err(SensorError::Timeout))
    }

    fn max_distance_cm(&self) -> f64 {
        400.0
    }

    fn close(&mut self) {
        *self.closed.borrow_mut() = true;
    }
}

#[derive(Default)]
struct MemorySink {
    readings: RefCell<Vec<WaterReading>>,
    fail: bool,
}

impl ReadingSink for MemorySink {
    fn insert(&self, reading: &WaterReading) -> Result<(), UploadError> {
        if self.fail {
            return Err(UploadError::Rejected {
                status: 503,
                body: "upstream unavailable".to_string(),
            });
        }
        self.readings.borrow_mut().push(reading.clone());
        Ok(())
    }
}

fn config_with_height(height: f64) -> MonitorConfig {
    MonitorConfig {
        sensor_height_cm: height,
        sample_spacing_ms: 0,
        report_interval_secs: 0.0,
        ..MonitorConfig::default()
    }
}

// ---------------------------------------------------------------------------
// 1. Averaging and level conversion
// ---------------------------------------------------------------------------

#[test]
fn test_uniform_samples_report_expected_level() {
    let sink = MemorySink::default();
    let mut monitor = Monitor::new(config_with_height(150.0), ScriptedSensor::distances(&[40.0; 5]), &sink);

    monitor.run_cycle().unwrap();

    let readings = sink.readings.borrow();
    assert_eq!(readings.len(), 1, "Exactly one record per successful cycle");
    assert_eq!(readings[0].level, Decimal::new(11000, 2));
}

#[test]
fn test_negative_sample_excluded_and_level_clamped() {
    let sink = MemorySink::default();
    let sensor = ScriptedSensor::distances(&[-1.0, 200.0, 200.0, 200.0, 200.0]);
    let mut monitor = Monitor::new(config_with_height(150.0), sensor, &sink);

    monitor.run_cycle().unwrap();

    let readings = sink.readings.borrow();
    assert_eq!(readings.len(), 1);
    assert_eq!(readings[0].level, Decimal::ZERO);
}

#[test]
fn test_mixed_samples_average_only_positive() {
    let sink = MemorySink::default();
    let sensor = ScriptedSensor::script(vec![
        Ok(30.0),
        Ok(0.0),
        Err(SensorError::Timeout),
        Ok(50.0),
        Ok(-7.5),
    ]);
    let mut monitor = Monitor::new(config_with_height(150.0), sensor, &sink);

    monitor.run_cycle().unwrap();

    // mean(30, 50) = 40 -> 150 - 40 = 110
    assert_eq!(sink.readings.borrow()[0].level_cm(), 110.0);
}

#[test]
fn test_level_rounded_to_two_places() {
    let sink = MemorySink::default();
    let sensor = ScriptedSensor::distances(&[33.333, 33.333, 33.333, 33.333, 33.333]);
    let mut monitor = Monitor::new(config_with_height(100.0), sensor, &sink);

    monitor.run_cycle().unwrap();

    assert_eq!(sink.readings.borrow()[0].level, Decimal::new(6667, 2));
}

// ---------------------------------------------------------------------------
// 2. Skipped and failed cycles
// ---------------------------------------------------------------------------

#[test]
fn test_no_upload_when_all_samples_invalid() {
    let sink = MemorySink::default();
    let sensor = ScriptedSensor::script(vec![
        Ok(-1.0),
        Ok(0.0),
        Err(SensorError::Timeout),
        Ok(-2.0),
        Err(SensorError::Timeout),
    ]);
    let mut monitor = Monitor::new(config_with_height(150.0), sensor, &sink);

    assert_eq!(monitor.run_cycle().unwrap(), CycleOutcome::NoValidSamples);
    assert!(sink.readings.borrow().is_empty());
}

#[test]
fn test_upload_failure_does_not_escape_cycle() {
    let sink = MemorySink {
        fail: true,
        ..MemorySink::default()
    };
    let mut monitor = Monitor::new(config_with_height(150.0), ScriptedSensor::distances(&[40.0; 10]), &sink);

    match monitor.run_cycle() {
        Ok(CycleOutcome::UploadFailed(reading)) => assert_eq!(reading.level_cm(), 110.0),
        other => panic!("expected UploadFailed, got {:?}", other),
    }

    assert!(monitor.run_cycle().is_ok(), "Next cycle should proceed normally");
    assert_eq!(monitor.stats().upload_failures, 2);
}

// ---------------------------------------------------------------------------
// 3. Loop termination and sensor release
// ---------------------------------------------------------------------------

#[test]
fn test_fatal_sensor_error_stops_loop_and_closes_sensor() {
    let sensor = ScriptedSensor::script(vec![
        Ok(40.0),
        Err(SensorError::Pin("echo line read failed".to_string())),
    ]);
    let closed = Rc::clone(&sensor.closed);
    let mut monitor = Monitor::new(config_with_height(150.0), sensor, MemorySink::default());

    let shutdown = AtomicBool::new(false);
    let result = monitor.run(&shutdown);

    assert!(matches!(result, Err(SensorError::Pin(_))));
    assert!(*closed.borrow(), "Sensor must be released after a fault");
}

#[test]
fn test_shutdown_flag_stops_loop_and_closes_sensor() {
    /// Raises the shutdown flag from inside the first upload.
    struct StopAfterFirst<'a> {
        shutdown: &'a AtomicBool,
        inserted: RefCell<usize>,
    }

    impl ReadingSink for StopAfterFirst<'_> {
        fn insert(&self, _reading: &WaterReading) -> Result<(), UploadError> {
            *self.inserted.borrow_mut() += 1;
            self.shutdown.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    let shutdown = AtomicBool::new(false);
    let sink = StopAfterFirst {
        shutdown: &shutdown,
        inserted: RefCell::new(0),
    };
    let sensor = ScriptedSensor::distances(&[40.0; 20]);
    let closed = Rc::clone(&sensor.closed);

    let mut monitor = Monitor::new(config_with_height(150.0), sensor, &sink);
    let stats = monitor.run(&shutdown).expect("clean shutdown");

    assert_eq!(stats.cycles, 1);
    assert_eq!(stats.uploaded, 1);
    assert_eq!(*sink.inserted.borrow(), 1);
    assert!(*closed.borrow(), "Sensor must be released on shutdown");
}

// ---------------------------------------------------------------------------
// 4. Cadence
// ---------------------------------------------------------------------------

#[test]
fn test_cycles_start_one_interval_apart() {
    /// Records when each cycle's first sample is taken.
    struct StampingSensor {
        stamps: Rc<RefCell<Vec<Instant>>>,
        taken: usize,
        per_cycle: usize,
    }

    impl DistanceSensor for StampingSensor {
        fn measure_cm(&mut self) -> Result<f64, SensorError> {
            if self.taken % self.per_cycle == 0 {
                self.stamps.borrow_mut().push(Instant::now());
            }
            self.taken += 1;
            Ok(40.0)
        }

        fn max_distance_cm(&self) -> f64 {
            400.0
        }
    }

    /// Raises the shutdown flag on the second upload.
    struct StopAfterSecond<'a> {
        shutdown: &'a AtomicBool,
        inserted: RefCell<usize>,
    }

    impl ReadingSink for StopAfterSecond<'_> {
        fn insert(&self, _reading: &WaterReading) -> Result<(), UploadError> {
            *self.inserted.borrow_mut() += 1;
            if *self.inserted.borrow() >= 2 {
                self.shutdown.store(true, Ordering::SeqCst);
            }
            Ok(())
        }
    }

    // 5 samples x 40 ms spacing makes each cycle take ~200 ms, so a loop
    // that slept the full interval after the cycle would start ~700 ms apart.
    let config = MonitorConfig {
        samples_per_reading: 5,
        sample_spacing_ms: 40,
        report_interval_secs: 0.5,
        ..MonitorConfig::default()
    };
    let stamps = Rc::new(RefCell::new(Vec::new()));
    let sensor = StampingSensor {
        stamps: Rc::clone(&stamps),
        taken: 0,
        per_cycle: 5,
    };
    let shutdown = AtomicBool::new(false);
    let sink = StopAfterSecond {
        shutdown: &shutdown,
        inserted: RefCell::new(0),
    };

    let mut monitor = Monitor::new(config, sensor, &sink);
    let stats = monitor.run(&shutdown).expect("clean shutdown");
    assert_eq!(stats.cycles, 2);

    let stamps = stamps.borrow();
    assert_eq!(stamps.len(), 2);
    let gap = stamps[1].duration_since(stamps[0]);
    assert!(gap >= Duration::from_millis(500), "cycles started {:?} apart", gap);
    assert!(gap < Duration::from_millis(650), "cycles started {:?} apart", gap);
}
