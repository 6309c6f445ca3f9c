/// Supabase (PostgREST) insert client.
///
/// One row per call:
///   POST {project_url}/rest/v1/{table}
///   apikey: <key>
///   Authorization: Bearer <key>
///   Prefer: return=minimal
///
/// With `return=minimal` a successful insert answers `201 Created` with an
/// empty body, so nothing is parsed on success.
///
/// API Documentation: https://supabase.com/docs/guides/api

use crate::config::Credentials;
use crate::model::WaterReading;
use crate::upload::{ReadingSink, UploadError};
use reqwest::blocking::Client;
use std::time::Duration;

const REST_PATH: &str = "rest/v1";

/// Longest server error body kept in `UploadError::Rejected`.
const MAX_ERROR_BODY: usize = 512;

pub struct SupabaseClient {
    http: Client,
    insert_url: String,
    key: String,
}

impl SupabaseClient {
    /// Builds a client for inserts into `table`.
    ///
    /// The underlying HTTP client is created once and reused every cycle.
    pub fn new(credentials: &Credentials, table: &str, timeout: Duration) -> Result<Self, UploadError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            insert_url: build_insert_url(&credentials.url, table),
            key: credentials.key.clone(),
        })
    }

    pub fn insert_url(&self) -> &str {
        &self.insert_url
    }
}

impl ReadingSink for SupabaseClient {
    fn insert(&self, reading: &WaterReading) -> Result<(), UploadError> {
        let body = serde_json::to_vec(reading)?;

        let response = self
            .http
            .post(&self.insert_url)
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
            .header("Content-Type", "application/json")
            .header("Prefer", "return=minimal")
            .body(body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().unwrap_or_default();
            truncate_at_char_boundary(&mut body, MAX_ERROR_BODY);
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

/// Builds the PostgREST insert endpoint for `table` under `project_url`.
///
/// # Example
/// ```
/// use wlmon_sensor::upload::supabase::build_insert_url;
///
/// assert_eq!(
///     build_insert_url("https://abc.supabase.co/", "water_readings"),
///     "https://abc.supabase.co/rest/v1/water_readings",
/// );
/// ```
pub fn build_insert_url(project_url: &str, table: &str) -> String {
    format!(
        "{}/{}/{}",
        project_url.trim_end_matches('/'),
        REST_PATH,
        urlencoding::encode(table)
    )
}

fn truncate_at_char_boundary(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
}
