//! In-memory store used by the engine tests. Mirrors the constraints the
//! Postgres schema enforces: one open tour per vehicle, unique report keys and
//! unique (tour, kind) queue entries.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::models::{
    Driver, DriverEcoMonitorReport, Entity, EntityKind, ReportKind, RetryQueueEntry, Tour,
    Trailer, TruckActivityReport, Upsert, Vehicle, Window,
};

#[derive(Default)]
struct State {
    drivers: BTreeMap<i64, Driver>,
    vehicles: BTreeMap<i64, Vehicle>,
    trailers: BTreeMap<i64, Trailer>,
    tours: Vec<Tour>,
    activity: Vec<TruckActivityReport>,
    eco: Vec<DriverEcoMonitorReport>,
    retry: Vec<RetryQueueEntry>,
    next_retry_id: i64,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    failing_vehicles: Mutex<HashSet<i64>>,
    failing_reports: Mutex<bool>,
}

fn unavailable() -> StoreError {
    StoreError::Database(sqlx::Error::PoolTimedOut)
}

fn bump(entry: &mut RetryQueueEntry, window: Window, reason: &str) {
    entry.trial += 1;
    entry.import_from = entry.import_from.min(window.start);
    entry.import_to = entry.import_to.max(window.end);
    entry.reason = reason.to_string();
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every tour query touching `vehicle_id` fail.
    pub fn fail_vehicle(&self, vehicle_id: i64) {
        self.failing_vehicles.lock().unwrap().insert(vehicle_id);
    }

    /// Makes every report write fail.
    pub fn fail_report_writes(&self) {
        *self.failing_reports.lock().unwrap() = true;
    }

    fn check_vehicle(&self, vehicle_id: i64) -> StoreResult<()> {
        if self.failing_vehicles.lock().unwrap().contains(&vehicle_id) {
            return Err(unavailable());
        }
        Ok(())
    }

    fn check_reports(&self) -> StoreResult<()> {
        if *self.failing_reports.lock().unwrap() {
            return Err(unavailable());
        }
        Ok(())
    }

    pub fn seed_tour(&self, tour: Tour) {
        self.state.lock().unwrap().tours.push(tour);
    }

    pub fn tours_of(&self, vehicle_id: i64) -> Vec<Tour> {
        let state = self.state.lock().unwrap();
        let mut tours: Vec<Tour> = state
            .tours
            .iter()
            .filter(|t| t.vehicle_id == vehicle_id)
            .cloned()
            .collect();
        tours.sort_by_key(|t| t.start_time);
        tours
    }

    pub fn tour(&self, tour_id: Uuid) -> Option<Tour> {
        let state = self.state.lock().unwrap();
        state.tours.iter().find(|t| t.tour_id == tour_id).cloned()
    }

    pub fn driver(&self, external_id: i64) -> Option<Driver> {
        self.state.lock().unwrap().drivers.get(&external_id).cloned()
    }

    pub fn vehicle(&self, external_id: i64) -> Option<Vehicle> {
        self.state.lock().unwrap().vehicles.get(&external_id).cloned()
    }

    pub fn trailer(&self, external_id: i64) -> Option<Trailer> {
        self.state.lock().unwrap().trailers.get(&external_id).cloned()
    }

    pub fn activity_reports(&self) -> Vec<TruckActivityReport> {
        self.state.lock().unwrap().activity.clone()
    }

    pub fn eco_reports(&self) -> Vec<DriverEcoMonitorReport> {
        self.state.lock().unwrap().eco.clone()
    }

    pub fn retry_entries(&self) -> Vec<RetryQueueEntry> {
        self.state.lock().unwrap().retry.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn entity_last_modified(
        &self,
        kind: EntityKind,
        external_id: i64,
    ) -> StoreResult<Option<NaiveDateTime>> {
        let state = self.state.lock().unwrap();
        let last_modified = match kind {
            EntityKind::Driver => state.drivers.get(&external_id).map(|d| d.last_modified),
            EntityKind::Vehicle => state.vehicles.get(&external_id).map(|v| v.last_modified),
            EntityKind::Trailer => state.trailers.get(&external_id).map(|t| t.last_modified),
        };
        Ok(last_modified)
    }

    async fn insert_entity(&self, entity: &Entity) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        let duplicate = match entity {
            Entity::Driver(d) => state.drivers.insert(d.external_id, d.clone()).is_some(),
            Entity::Vehicle(v) => state.vehicles.insert(v.external_id, v.clone()).is_some(),
            Entity::Trailer(t) => state.trailers.insert(t.external_id, t.clone()).is_some(),
        };
        if duplicate {
            return Err(StoreError::Corrupt(format!(
                "duplicate {} {}",
                entity.kind(),
                entity.external_id()
            )));
        }
        Ok(())
    }

    async fn update_entity(&self, entity: &Entity) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        match entity {
            Entity::Driver(d) => {
                if let Some(slot) = state.drivers.get_mut(&d.external_id) {
                    *slot = d.clone();
                }
            }
            Entity::Vehicle(v) => {
                if let Some(slot) = state.vehicles.get_mut(&v.external_id) {
                    *slot = v.clone();
                }
            }
            Entity::Trailer(t) => {
                if let Some(slot) = state.trailers.get_mut(&t.external_id) {
                    *slot = t.clone();
                }
            }
        }
        Ok(())
    }

    async fn open_tour(&self, vehicle_id: i64) -> StoreResult<Option<Tour>> {
        self.check_vehicle(vehicle_id)?;
        let state = self.state.lock().unwrap();
        Ok(state
            .tours
            .iter()
            .find(|t| t.vehicle_id == vehicle_id && t.end_time.is_none())
            .cloned())
    }

    async fn count_tours(&self, vehicle_id: i64) -> StoreResult<i64> {
        self.check_vehicle(vehicle_id)?;
        let state = self.state.lock().unwrap();
        Ok(state.tours.iter().filter(|t| t.vehicle_id == vehicle_id).count() as i64)
    }

    async fn start_tour(
        &self,
        previous: Option<(Uuid, NaiveDateTime)>,
        tour: &Tour,
    ) -> StoreResult<()> {
        self.check_vehicle(tour.vehicle_id)?;
        let mut state = self.state.lock().unwrap();

        let mut closed = state.tours.clone();
        if let Some((previous_id, end_time)) = previous {
            if let Some(t) = closed
                .iter_mut()
                .find(|t| t.tour_id == previous_id && t.end_time.is_none())
            {
                t.end_time = Some(end_time);
                t.updated_at = end_time;
            }
        }
        let still_open = closed
            .iter()
            .any(|t| t.vehicle_id == tour.vehicle_id && t.end_time.is_none());
        if still_open && tour.end_time.is_none() {
            return Err(StoreError::Corrupt(format!(
                "vehicle {} already has an open tour",
                tour.vehicle_id
            )));
        }

        closed.push(tour.clone());
        state.tours = closed;
        Ok(())
    }

    async fn update_tour_status(
        &self,
        tour_id: Uuid,
        status: &str,
        updated_at: NaiveDateTime,
    ) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(t) = state.tours.iter_mut().find(|t| t.tour_id == tour_id) {
            t.status = status.to_string();
            t.updated_at = updated_at;
        }
        Ok(())
    }

    async fn find_tour(&self, tour_id: Uuid) -> StoreResult<Option<Tour>> {
        Ok(self.tour(tour_id))
    }

    async fn tours_due(&self, closed_since: Option<NaiveDateTime>) -> StoreResult<Vec<Tour>> {
        let state = self.state.lock().unwrap();
        let mut tours: Vec<Tour> = state
            .tours
            .iter()
            .filter(|t| match (closed_since, t.end_time) {
                (None, _) | (_, None) => true,
                (Some(cutoff), Some(end_time)) => end_time >= cutoff,
            })
            .cloned()
            .collect();
        tours.sort_by_key(|t| (t.start_time, t.tour_id));
        Ok(tours)
    }

    async fn set_last_import(&self, tour_id: Uuid, at: NaiveDateTime) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(t) = state.tours.iter_mut().find(|t| t.tour_id == tour_id) {
            t.last_import = Some(at);
        }
        Ok(())
    }

    async fn upsert_activity_report(&self, report: &TruckActivityReport) -> StoreResult<Upsert> {
        self.check_reports()?;
        let mut state = self.state.lock().unwrap();
        match state
            .activity
            .iter_mut()
            .find(|r| r.tour_id == report.tour_id && r.start_time == report.start_time)
        {
            Some(existing) => {
                *existing = report.clone();
                Ok(Upsert::Updated)
            }
            None => {
                state.activity.push(report.clone());
                Ok(Upsert::Inserted)
            }
        }
    }

    async fn upsert_eco_report(&self, report: &DriverEcoMonitorReport) -> StoreResult<Upsert> {
        self.check_reports()?;
        let mut state = self.state.lock().unwrap();
        match state
            .eco
            .iter_mut()
            .find(|r| r.tour_id == report.tour_id && r.start_time == report.start_time)
        {
            Some(existing) => {
                *existing = report.clone();
                Ok(Upsert::Updated)
            }
            None => {
                state.eco.push(report.clone());
                Ok(Upsert::Inserted)
            }
        }
    }

    async fn find_retry_entry(
        &self,
        tour_id: Uuid,
        kind: ReportKind,
    ) -> StoreResult<Option<RetryQueueEntry>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .retry
            .iter()
            .find(|e| e.tour_id == tour_id && e.kind == kind)
            .cloned())
    }

    async fn insert_retry_entry(
        &self,
        tour_id: Uuid,
        kind: ReportKind,
        window: Window,
        reason: &str,
    ) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(e) = state
            .retry
            .iter_mut()
            .find(|e| e.tour_id == tour_id && e.kind == kind)
        {
            bump(e, window, reason);
            return Ok(());
        }
        state.next_retry_id += 1;
        let id = state.next_retry_id;
        state.retry.push(RetryQueueEntry {
            id,
            tour_id,
            kind,
            import_from: window.start,
            import_to: window.end,
            reason: reason.to_string(),
            trial: 0,
        });
        Ok(())
    }

    async fn bump_retry_entry(&self, id: i64, window: Window, reason: &str) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(e) = state.retry.iter_mut().find(|e| e.id == id) {
            bump(e, window, reason);
        }
        Ok(())
    }

    async fn retry_entries_before(
        &self,
        cutoff: NaiveDateTime,
    ) -> StoreResult<Vec<RetryQueueEntry>> {
        let state = self.state.lock().unwrap();
        let mut entries: Vec<RetryQueueEntry> = state
            .retry
            .iter()
            .filter(|e| e.import_from < cutoff)
            .cloned()
            .collect();
        entries.sort_by_key(|e| (e.import_from, e.id));
        Ok(entries)
    }

    async fn delete_retry_entry(&self, id: i64) -> StoreResult<()> {
        self.state.lock().unwrap().retry.retain(|e| e.id != id);
        Ok(())
    }

    async fn closed_tours_between(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
        drivers: &[i64],
    ) -> StoreResult<Vec<Tour>> {
        let state = self.state.lock().unwrap();
        let mut tours: Vec<Tour> = state
            .tours
            .iter()
            .filter(|t| t.start_time >= from)
            .filter(|t| matches!(t.end_time, Some(end) if end <= to))
            .filter(|t| {
                drivers.is_empty() || t.driver_id.map_or(false, |d| drivers.contains(&d))
            })
            .cloned()
            .collect();
        tours.sort_by_key(|t| (t.driver_id, t.start_time));
        Ok(tours)
    }

    async fn activity_reports_for(
        &self,
        tour_ids: &[Uuid],
    ) -> StoreResult<Vec<TruckActivityReport>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .activity
            .iter()
            .filter(|r| tour_ids.contains(&r.tour_id))
            .cloned()
            .collect())
    }

    async fn eco_reports_for(&self, tour_ids: &[Uuid]) -> StoreResult<Vec<DriverEcoMonitorReport>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .eco
            .iter()
            .filter(|r| tour_ids.contains(&r.tour_id))
            .cloned()
            .collect())
    }

    async fn drivers_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Driver>> {
        let state = self.state.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| state.drivers.get(id).cloned())
            .collect())
    }

    async fn vehicles_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Vehicle>> {
        let state = self.state.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| state.vehicles.get(id).cloned())
            .collect())
    }
}
