/// Monitor configuration: compile-time defaults, `sensor.toml`, credentials.
///
/// The defaults below describe the reference install (HC-SR04 on BCM 18/24,
/// mounted 150 cm above the channel bed). A `sensor.toml` in the working
/// directory can override any subset of them without recompiling. Supabase
/// credentials come from `SUPABASE_URL` / `SUPABASE_KEY` (a `.env` file is
/// loaded if present), falling back to the constants here.

use serde::Deserialize;
use std::env;
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Compile-time defaults
// ---------------------------------------------------------------------------

/// GPIO trigger line (BCM numbering).
pub const TRIGGER_PIN: u8 = 18;
/// GPIO echo line (BCM numbering).
pub const ECHO_PIN: u8 = 24;

/// Height of the sensor above the ground / channel bed, in cm.
/// If the sensor is mounted 150 cm above the bottom, this is 150.
pub const SENSOR_HEIGHT_CM: f64 = 150.0;
/// HC-SR04 usable range.
pub const MAX_DISTANCE_CM: f64 = 400.0;

/// Sanity ceilings for `sensor.toml` values (100 m mount, 10 m range, 1 day cadence).
pub const SENSOR_HEIGHT_LIMIT_CM: f64 = 10_000.0;
pub const MAX_DISTANCE_LIMIT_CM: f64 = 1_000.0;
pub const REPORT_INTERVAL_LIMIT_SECS: f64 = 86_400.0;

pub const SENSOR_ID: &str = "raspberry_pi_1";

pub const SAMPLES_PER_READING: usize = 5;
pub const SAMPLE_SPACING_MS: u64 = 100;
pub const REPORT_INTERVAL_SECS: f64 = 30.0;

pub const SUPABASE_URL: &str = "your_supabase_url_here";
pub const SUPABASE_KEY: &str = "your_supabase_anon_key_here";
pub const TABLE: &str = "water_readings";
pub const UPLOAD_TIMEOUT_SECS: u64 = 10;

/// Optional override file, relative to the working directory.
pub const CONFIG_FILE: &str = "sensor.toml";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error(
        "{0} is not configured.\n\n  \
         Required Setup:\n  \
         1. Copy .env.example to .env: cp .env.example .env\n  \
         2. Set SUPABASE_URL=https://<project>.supabase.co\n  \
         3. Set SUPABASE_KEY=<anon key from Project Settings > API>"
    )]
    MissingCredential(&'static str),

    #[error(
        "Invalid SUPABASE_URL format: {0}\n\n  \
         Expected format: https://<project>.supabase.co"
    )]
    InvalidUrl(String),

    #[error("invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Everything the monitoring loop needs to run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorConfig {
    pub trigger_pin: u8,
    pub echo_pin: u8,
    pub sensor_height_cm: f64,
    pub max_distance_cm: f64,
    pub sensor_id: String,

    /// Raw samples averaged into one reading.
    pub samples_per_reading: usize,
    pub sample_spacing_ms: u64,
    /// Time between the start of consecutive cycles. Fractions are allowed.
    pub report_interval_secs: f64,

    pub table: String,
    pub upload_timeout_secs: u64,

    /// Never read from `sensor.toml`; see `Credentials::from_env`.
    #[serde(skip)]
    pub credentials: Credentials,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            trigger_pin: TRIGGER_PIN,
            echo_pin: ECHO_PIN,
            sensor_height_cm: SENSOR_HEIGHT_CM,
            max_distance_cm: MAX_DISTANCE_CM,
            sensor_id: SENSOR_ID.to_string(),
            samples_per_reading: SAMPLES_PER_READING,
            sample_spacing_ms: SAMPLE_SPACING_MS,
            report_interval_secs: REPORT_INTERVAL_SECS,
            table: TABLE.to_string(),
            upload_timeout_secs: UPLOAD_TIMEOUT_SECS,
            credentials: Credentials::default(),
        }
    }
}

impl MonitorConfig {
    pub fn sample_spacing(&self) -> Duration {
        Duration::from_millis(self.sample_spacing_ms)
    }

    pub fn report_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.report_interval_secs).unwrap_or(Duration::ZERO)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    /// Parses TOML overrides on top of the compile-time defaults.
    pub fn from_toml_str(contents: &str, path: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    /// Checks the sampling settings. Credentials are checked separately.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.sensor_height_cm > 0.0 && self.sensor_height_cm <= SENSOR_HEIGHT_LIMIT_CM) {
            return Err(invalid("sensor_height_cm", "must be between 0 and 10000 cm"));
        }
        if !(self.max_distance_cm > 0.0 && self.max_distance_cm <= MAX_DISTANCE_LIMIT_CM) {
            return Err(invalid("max_distance_cm", "must be between 0 and 1000 cm"));
        }
        if !(self.report_interval_secs >= 0.0 && self.report_interval_secs <= REPORT_INTERVAL_LIMIT_SECS) {
            return Err(invalid("report_interval_secs", "must be between 0 and 86400 s"));
        }
        if self.samples_per_reading == 0 {
            return Err(invalid("samples_per_reading", "must be at least 1"));
        }
        if self.sensor_id.trim().is_empty() {
            return Err(invalid("sensor_id", "must not be empty"));
        }
        if self.table.trim().is_empty() {
            return Err(invalid("table", "must not be empty"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

/// Supabase project URL and API key.
#[derive(Clone, PartialEq)]
pub struct Credentials {
    pub url: String,
    pub key: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            url: SUPABASE_URL.to_string(),
            key: SUPABASE_KEY.to_string(),
        }
    }
}

// The key is a bearer token; keep it out of debug logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("url", &self.url)
            .field("key", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Reads `SUPABASE_URL` / `SUPABASE_KEY`, loading `.env` first.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        let defaults = Self::default();
        Self {
            url: env::var("SUPABASE_URL").unwrap_or(defaults.url),
            key: env::var("SUPABASE_KEY").unwrap_or(defaults.key),
        }
    }

    /// Rejects placeholder values and malformed URLs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() || self.url == SUPABASE_URL {
            return Err(ConfigError::MissingCredential("SUPABASE_URL"));
        }
        if self.key.trim().is_empty() || self.key == SUPABASE_KEY {
            return Err(ConfigError::MissingCredential("SUPABASE_KEY"));
        }
        if !self.url.starts_with("https://") && !self.url.starts_with("http://") {
            return Err(ConfigError::InvalidUrl(self.url.clone()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Loads overrides from `path` if it exists, otherwise the defaults.
///
/// Credentials are not touched; see `load_config`.
pub fn load_config_from(path: &Path) -> Result<MonitorConfig, ConfigError> {
    let display = path.display().to_string();

    let config = match fs::read_to_string(path) {
        Ok(contents) => MonitorConfig::from_toml_str(&contents, &display)?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::info!("No {} found, using built-in defaults", display);
            MonitorConfig::default()
        }
        Err(source) => return Err(ConfigError::Read { path: display, source }),
    };

    config.validate()?;
    Ok(config)
}

/// Loads `sensor.toml` plus credentials from the environment, validating both.
pub fn load_config() -> Result<MonitorConfig, ConfigError> {
    let mut config = load_config_from(Path::new(CONFIG_FILE))?;
    config.credentials = Credentials::from_env();
    config.credentials.validate()?;
    Ok(config)
}
