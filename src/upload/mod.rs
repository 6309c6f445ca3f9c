/// Reading upload: the `ReadingSink` port and its Supabase implementation.

pub mod supabase;

pub use supabase::SupabaseClient;

use crate::model::WaterReading;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    /// Connection, DNS, TLS or timeout failure before a response arrived.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("server rejected insert ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("could not encode reading: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Destination for finished readings.
pub trait ReadingSink {
    /// Stores one reading. Called at most once per cycle.
    fn insert(&self, reading: &WaterReading) -> Result<(), UploadError>;
}

impl<T: ReadingSink + ?Sized> ReadingSink for &T {
    fn insert(&self, reading: &WaterReading) -> Result<(), UploadError> {
        (**self).insert(reading)
    }
}
