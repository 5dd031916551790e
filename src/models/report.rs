use chrono::NaiveDateTime;
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// The two report feeds reconciled per tour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    Activity,
    EcoMonitor,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Activity => "activity",
            ReportKind::EcoMonitor => "eco_monitor",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "activity" => Ok(ReportKind::Activity),
            "eco_monitor" => Ok(ReportKind::EcoMonitor),
            other => Err(format!("unknown report kind '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct TruckActivityReport {
    pub tour_id: Uuid,
    pub vehicle_id: i64,
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
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
}

/// Eco-driving statistics of one driver, measured from contact on to contact off.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct DriverEcoMonitorReport {
    pub tour_id: Uuid,
    pub driver_id: i64,
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
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
}

/// Result of writing a report keyed by (tour_id, start_time).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Updated,
}
