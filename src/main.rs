//! Water Level Sensor Service - Main Daemon
//!
//! Runs on the Raspberry Pi the ultrasonic sensor is wired to and:
//! 1. Samples the water surface distance every 30 seconds
//! 2. Converts it to a level above the channel bed
//! 3. Inserts one reading per cycle into the Supabase `water_readings` table
//!
//! Usage:
//!   cargo run --release
//!
//! Environment:
//!   SUPABASE_URL - Supabase project URL (or set in .env)
//!   SUPABASE_KEY - Supabase anon key (or set in .env)
//!   RUST_LOG     - log filter (default: info)
//!
//! Optional `sensor.toml` in the working directory overrides pins, mount
//! height and cadence.

use signal_hook::consts::{SIGINT, SIGTERM};
use std::process;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use wlmon_sensor::config;
use wlmon_sensor::daemon::Monitor;
use wlmon_sensor::sensor::gpio;
use wlmon_sensor::upload::SupabaseClient;

fn main() {
    // Before the logger, so RUST_LOG from .env applies
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("{}", e);
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load_config()?;
    log::debug!("{:?}", config);

    let shutdown = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&shutdown))?;
    }

    let uploader = SupabaseClient::new(&config.credentials, &config.table, config.upload_timeout())?;
    log::info!("Uploading to {}", uploader.insert_url());

    let sensor = gpio::open(config.trigger_pin, config.echo_pin, config.max_distance_cm)?;

    let mut monitor = Monitor::new(config, sensor, uploader);
    monitor.run(&shutdown)?;

    Ok(())
}
