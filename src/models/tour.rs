use chrono::{Duration, NaiveDateTime};
use sqlx::FromRow;
use uuid::Uuid;

/// One continuous trip of one vehicle toward one destination.
///
/// Two drivers sharing a truck on the same trip produce two tours, since the
/// driver is part of the tour key.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Tour {
    pub tour_id: Uuid,
    pub vehicle_id: i64,
    pub driver_id: Option<i64>,
    pub trailer_id: Option<i64>,
    pub destination_longitude: f64,
    pub destination_latitude: f64,
    pub status: String, // mirrored from the upstream ETA status
    pub start_time: NaiveDateTime,
    pub end_time: Option<NaiveDateTime>,
    pub last_import: Option<NaiveDateTime>,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TourState {
    Open,
    Closed { end_time: NaiveDateTime },
}

/// Identity of a tour as seen from a vehicle snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct TourKey {
    pub vehicle_id: i64,
    pub driver_id: Option<i64>,
    pub trailer_id: Option<i64>,
    pub destination_longitude: f64,
    pub destination_latitude: f64,
}

impl Tour {
    pub fn state(&self) -> TourState {
        match self.end_time {
            None => TourState::Open,
            Some(end_time) => TourState::Closed { end_time },
        }
    }

    pub fn is_open(&self) -> bool {
        self.state() == TourState::Open
    }

    pub fn key(&self) -> TourKey {
        TourKey {
            vehicle_id: self.vehicle_id,
            driver_id: self.driver_id,
            trailer_id: self.trailer_id,
            destination_longitude: self.destination_longitude,
            destination_latitude: self.destination_latitude,
        }
    }

    /// A closed tour whose end lies further back than `settle` no longer gets
    /// scheduled; only the retry queue can still reach it.
    pub fn is_settled(&self, now: NaiveDateTime, settle: Duration) -> bool {
        match self.state() {
            TourState::Open => false,
            TourState::Closed { end_time } => end_time + settle < now,
        }
    }

    /// Whether a record spanning `[start, end]` belongs to this tour.
    /// An open tour has no upper bound.
    pub fn contains(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        if start < self.start_time {
            return false;
        }
        match self.state() {
            TourState::Open => true,
            TourState::Closed { end_time } => start < end_time && end <= end_time,
        }
    }
}
