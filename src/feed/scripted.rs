//! Feed double for the engine tests: replays queued responses and records
//! every report request it receives.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use super::{
    FeedError, FeedResponse, RawActivityRecord, RawDriver, RawEcoRecord, RawVehicle,
    TelematicsFeed,
};
use crate::db::memory::MemoryStore;
use crate::db::Store;
use crate::models::{ReportKind, Window};

type Scripted<T> = Mutex<VecDeque<Result<FeedResponse<T>, FeedError>>>;

#[derive(Default)]
pub struct ScriptedFeed {
    drivers: Scripted<RawDriver>,
    vehicles: Scripted<RawVehicle>,
    activity: Scripted<RawActivityRecord>,
    eco: Scripted<RawEcoRecord>,
    requests: Mutex<Vec<(ReportKind, i64, Window)>>,
    enqueue_during_fetch: Mutex<Option<(Arc<MemoryStore>, Uuid, ReportKind)>>,
}

fn next<T>(queue: &Scripted<T>) -> Result<FeedResponse<T>, FeedError> {
    queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Ok(FeedResponse::default()))
}

impl ScriptedFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_drivers(&self, response: Result<FeedResponse<RawDriver>, FeedError>) {
        self.drivers.lock().unwrap().push_back(response);
    }

    pub fn push_vehicles(&self, response: Result<FeedResponse<RawVehicle>, FeedError>) {
        self.vehicles.lock().unwrap().push_back(response);
    }

    pub fn push_activity(&self, response: Result<FeedResponse<RawActivityRecord>, FeedError>) {
        self.activity.lock().unwrap().push_back(response);
    }

    pub fn push_eco(&self, response: Result<FeedResponse<RawEcoRecord>, FeedError>) {
        self.eco.lock().unwrap().push_back(response);
    }

    /// Report requests received so far, in call order.
    pub fn requests(&self) -> Vec<(ReportKind, i64, Window)> {
        self.requests.lock().unwrap().clone()
    }

    /// Re-enqueues `(tour_id, kind)` while the next report request is in
    /// flight, as a concurrent pass would.
    pub fn enqueue_during_next_fetch(&self, store: Arc<MemoryStore>, tour_id: Uuid, kind: ReportKind) {
        *self.enqueue_during_fetch.lock().unwrap() = Some((store, tour_id, kind));
    }

    async fn on_report_request(&self, kind: ReportKind, id: i64, window: Window) {
        self.requests.lock().unwrap().push((kind, id, window));
        let racing = self.enqueue_during_fetch.lock().unwrap().take();
        if let Some((store, tour_id, kind)) = racing {
            store
                .insert_retry_entry(tour_id, kind, Window::day(window.start), "concurrent pass")
                .await
                .unwrap();
        }
    }
}

#[async_trait]
impl TelematicsFeed for ScriptedFeed {
    async fn fetch_drivers(&self) -> Result<FeedResponse<RawDriver>, FeedError> {
        next(&self.drivers)
    }

    async fn fetch_vehicles(&self) -> Result<FeedResponse<RawVehicle>, FeedError> {
        next(&self.vehicles)
    }

    async fn fetch_activity_report(
        &self,
        vehicle_id: i64,
        window: Window,
    ) -> Result<FeedResponse<RawActivityRecord>, FeedError> {
        self.on_report_request(ReportKind::Activity, vehicle_id, window)
            .await;
        next(&self.activity)
    }

    async fn fetch_eco_report(
        &self,
        driver_id: i64,
        window: Window,
    ) -> Result<FeedResponse<RawEcoRecord>, FeedError> {
        self.on_report_request(ReportKind::EcoMonitor, driver_id, window)
            .await;
        next(&self.eco)
    }
}
