use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime};
use tracing::warn;

use crate::models::Window;

pub mod records;
#[cfg(test)]
pub mod scripted;
pub mod soap;

pub use soap::{Login, SoapFeed};

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider answered HTTP {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Error or warning embedded in an otherwise successful provider response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedNotice {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedResponse<T> {
    pub items: Vec<T>,
    pub error: Option<FeedNotice>,
    pub warning: Option<FeedNotice>,
}

impl<T> Default for FeedResponse<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            error: None,
            warning: None,
        }
    }
}

impl<T> FeedResponse<T> {
    #[cfg(test)]
    pub fn with_items(items: Vec<T>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    pub fn log_notices(&self, context: &str) {
        if let Some(e) = &self.error {
            warn!("{}: provider error {} - {}", context, e.code, e.message);
        }
        if let Some(w) = &self.warning {
            warn!("{}: provider warning {} - {}", context, w.code, w.message);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawDriver {
    pub external_id: i64,
    pub person_code: String,
    pub name: String,
    pub language: String,
    pub inactive: bool,
    pub modified: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawTrailer {
    pub external_id: i64,
    pub license_plate: String,
}

/// Vehicle snapshot: master data plus the current driver, trailer and ETA
/// destination, which drive the tour state machine.
#[derive(Debug, Clone, PartialEq)]
pub struct RawVehicle {
    pub external_id: i64,
    pub license_plate: String,
    pub inactive: bool,
    pub modified: String,
    pub group: Option<String>,
    pub driver_id: Option<i64>,
    pub trailer: Option<RawTrailer>,
    pub eta_status: String,
    pub destination_longitude: f64,
    pub destination_latitude: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawActivityRecord {
    pub begin: String,
    pub end: String,
    pub km_begin: i32,
    pub km_end: i32,
    pub consumption: f64,
    pub loaded_status: String,
    pub activity: String,
    pub speed_avg: f64,
    pub longitude: f64,
    pub latitude: f64,
    pub address_info: String,
    pub country_code: String,
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawEcoRecord {
    pub begin: String,
    pub end: String,
    pub distance: f64,
    pub duration_driving: f64,
    pub fuel_consumption: f64,
    pub fuel_consumption_average: f64,
    pub rpm_average: f64,
    pub emission_average: f64,
    pub speed_average: f64,
    pub fuel_consumption_idling: f64,
    pub duration_idling: f64,
    pub number_idling: i32,
    pub duration_over_speeding: f64,
    pub number_over_speeding: i32,
    pub distance_coasting: f64,
    pub duration_coasting: f64,
    pub number_of_stops: i32,
    pub number_of_brakes: i32,
    pub number_of_panic_brakes: i32,
    pub number_of_harsh_accelerations: i32,
    pub number_of_gear_changes: i32,
    pub distance_on_cruise_control: f64,
    pub duration_on_cruise_control: f64,
}

/// The telematics provider as seen by the engine.
#[async_trait]
pub trait TelematicsFeed: Send + Sync {
    async fn fetch_drivers(&self) -> Result<FeedResponse<RawDriver>, FeedError>;
    async fn fetch_vehicles(&self) -> Result<FeedResponse<RawVehicle>, FeedError>;
    async fn fetch_activity_report(
        &self,
        vehicle_id: i64,
        window: Window,
    ) -> Result<FeedResponse<RawActivityRecord>, FeedError>;
    async fn fetch_eco_report(
        &self,
        driver_id: i64,
        window: Window,
    ) -> Result<FeedResponse<RawEcoRecord>, FeedError>;
}

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
];

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|t| t.naive_utc())
        })
}

/// Provider timestamps that cannot be read degrade to the zero value (Unix
/// epoch) instead of rejecting the record they belong to.
pub fn parse_timestamp_or_zero(raw: &str) -> NaiveDateTime {
    parse_timestamp(raw).unwrap_or_else(|| {
        warn!("Invalid provider timestamp: '{}'", raw);
        NaiveDateTime::default()
    })
}
