//! Bench check for the ultrasonic sensor wiring and mount height.
//!
//! Takes a few sampling rounds with the configured pins and prints every raw
//! sample, the averaged distance and the resulting water level. Nothing is
//! uploaded, so Supabase credentials are not required.
//!
//! Usage:
//!   cargo run --bin check_sensor            # 3 rounds
//!   cargo run --bin check_sensor -- 10      # 10 rounds

use std::env;
use std::path::Path;
use std::process;
use wlmon_sensor::config::{self, MonitorConfig};
use wlmon_sensor::sampling::{self, RawSample};
use wlmon_sensor::sensor::{gpio, DistanceSensor, SensorError};

const DEFAULT_ROUNDS: usize = 3;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().collect();
    let rounds = match args.get(1) {
        None => DEFAULT_ROUNDS,
        Some(arg) => match arg.parse::<usize>() {
            Ok(n) if n > 0 => n,
            _ => {
                eprintln!("Usage: {} [ROUNDS]", args[0]);
                process::exit(1);
            }
        },
    };

    let config = match config::load_config_from(Path::new(config::CONFIG_FILE)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ Configuration error: {}", e);
            process::exit(1);
        }
    };

    println!("Sensor check");
    println!("  GPIO pins: TRIG={}, ECHO={}", config.trigger_pin, config.echo_pin);
    println!("  Sensor height from ground: {} cm", config.sensor_height_cm);
    println!("  Max range: {} cm\n", config.max_distance_cm);

    let mut sensor = match gpio::open(config.trigger_pin, config.echo_pin, config.max_distance_cm) {
        Ok(sensor) => sensor,
        Err(e) => {
            eprintln!("✗ {}", e);
            process::exit(1);
        }
    };
    println!("✓ Sensor opened");

    let result = check_rounds(&mut sensor, &config, rounds);
    sensor.close();

    if let Err(e) = result {
        eprintln!("✗ Sensor fault: {}", e);
        process::exit(1);
    }
}

fn check_rounds<S: DistanceSensor>(
    sensor: &mut S,
    config: &MonitorConfig,
    rounds: usize,
) -> Result<(), SensorError> {
    for round in 1..=rounds {
        println!("Round {}/{}", round, rounds);

        let samples = sampling::collect_samples(sensor, config.samples_per_reading, config.sample_spacing())?;
        for (i, sample) in samples.raw.iter().enumerate() {
            match sample {
                RawSample::Accepted(d) => println!("   {} - {:.2} cm", i + 1, d),
                RawSample::Rejected(d) => println!("   {} - {:.2} cm (rejected)", i + 1, d),
                RawSample::NoEcho => println!("   {} - no echo (rejected)", i + 1),
            }
        }

        match samples.average() {
            Some(distance) => {
                let level = sampling::water_level_cm(config.sensor_height_cm, distance);
                println!("   ✓ Distance to water: {:.2} cm", distance);
                println!("   ✓ Water level: {:.2} cm\n", level);
            }
            None => println!("   ✗ No valid readings obtained\n"),
        }
    }

    Ok(())
}
