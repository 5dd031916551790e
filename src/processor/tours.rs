use chrono::{Duration, NaiveDateTime};
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::{Store, StoreResult};
use crate::feed::RawVehicle;
use crate::models::{Tour, TourKey};

/// How far back the very first tour of a vehicle starts, so the scheduler
/// has a non-empty window to reconcile right away.
const FIRST_TOUR_BACKDATE_DAYS: i64 = 1;

/// What a vehicle snapshot says about its current trip.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub vehicle_id: i64,
    pub driver_id: Option<i64>,
    pub trailer_id: Option<i64>,
    pub status: String,
    pub destination_longitude: f64,
    pub destination_latitude: f64,
    pub vehicle_modified: NaiveDateTime,
}

impl Observation {
    pub fn key(&self) -> TourKey {
        TourKey {
            vehicle_id: self.vehicle_id,
            driver_id: self.driver_id,
            trailer_id: self.trailer_id,
            destination_longitude: self.destination_longitude,
            destination_latitude: self.destination_latitude,
        }
    }

    /// Without a driver and a destination there is no trip to track.
    pub fn is_actionable(&self) -> bool {
        self.driver_id.is_some()
            && self.destination_longitude != 0.0
            && self.destination_latitude != 0.0
    }
}

impl From<&RawVehicle> for Observation {
    fn from(raw: &RawVehicle) -> Self {
        Self {
            vehicle_id: raw.external_id,
            driver_id: raw.driver_id,
            trailer_id: raw.trailer.as_ref().map(|t| t.external_id),
            status: raw.eta_status.clone(),
            destination_longitude: raw.destination_longitude,
            destination_latitude: raw.destination_latitude,
            vehicle_modified: crate::feed::parse_timestamp_or_zero(&raw.modified),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Ignore,
    Skip { tour_id: Uuid },
    UpdateStatus { tour_id: Uuid },
    /// Open a new tour, closing `close` first. `backdate` is set for the first
    /// tour a vehicle ever gets.
    Open { close: Option<Uuid>, backdate: bool },
}

/// Decides the next move for one vehicle. Only the currently open tour is
/// ever matched against the observation.
pub fn transition(observation: &Observation, open: Option<&Tour>, has_history: bool) -> Transition {
    if !observation.is_actionable() {
        return Transition::Ignore;
    }
    match open {
        Some(tour) if tour.key() == observation.key() => {
            if observation.vehicle_modified > tour.updated_at {
                Transition::UpdateStatus {
                    tour_id: tour.tour_id,
                }
            } else {
                Transition::Skip {
                    tour_id: tour.tour_id,
                }
            }
        }
        Some(tour) => Transition::Open {
            close: Some(tour.tour_id),
            backdate: false,
        },
        None => Transition::Open {
            close: None,
            backdate: !has_history,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TourEvent {
    Ignored,
    Skipped(Uuid),
    Updated(Uuid),
    Created { tour_id: Uuid, closed: Option<Uuid> },
}

/// Applies one vehicle snapshot to the stored tours of that vehicle.
pub async fn observe(
    store: &dyn Store,
    observation: &Observation,
    now: NaiveDateTime,
) -> StoreResult<TourEvent> {
    let vehicle_id = observation.vehicle_id;
    let driver = observation
        .driver_id
        .map_or_else(|| "-".to_string(), |d| d.to_string());

    if !observation.is_actionable() {
        debug!("No destination or driver for vehicle {}", vehicle_id);
        return Ok(TourEvent::Ignored);
    }

    let open = store.open_tour(vehicle_id).await?;
    let has_history = match open {
        Some(_) => true,
        None => store.count_tours(vehicle_id).await? > 0,
    };

    match transition(observation, open.as_ref(), has_history) {
        Transition::Ignore => Ok(TourEvent::Ignored),
        Transition::Skip { tour_id } => {
            info!("Skipped tour of driver {} in vehicle {}", driver, vehicle_id);
            Ok(TourEvent::Skipped(tour_id))
        }
        Transition::UpdateStatus { tour_id } => {
            info!("Updating tour of driver {} in vehicle {}", driver, vehicle_id);
            store
                .update_tour_status(tour_id, &observation.status, now)
                .await?;
            Ok(TourEvent::Updated(tour_id))
        }
        Transition::Open { close, backdate } => {
            info!("Creating a new tour of driver {} in vehicle {}", driver, vehicle_id);
            let start_time = if backdate {
                now - Duration::days(FIRST_TOUR_BACKDATE_DAYS)
            } else {
                now
            };
            let tour = Tour {
                tour_id: Uuid::new_v4(),
                vehicle_id,
                driver_id: observation.driver_id,
                trailer_id: observation.trailer_id,
                destination_longitude: observation.destination_longitude,
                destination_latitude: observation.destination_latitude,
                status: observation.status.clone(),
                start_time,
                end_time: None,
                last_import: None,
                updated_at: now,
            };
            store.start_tour(close.map(|id| (id, now)), &tour).await?;
            Ok(TourEvent::Created {
                tour_id: tour.tour_id,
                closed: close,
            })
        }
    }
}
