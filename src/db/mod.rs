use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::models::{
    Driver, DriverEcoMonitorReport, Entity, EntityKind, ReportKind, RetryQueueEntry, Tour,
    TruckActivityReport, Upsert, Vehicle, Window,
};

#[cfg(test)]
pub mod memory;
pub mod postgres;
pub mod queries;

pub use postgres::PgStore;

pub type DbPool = Pool<Postgres>;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<DbPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Applies pending migrations; already applied ones are skipped.
pub async fn migrate(pool: &DbPool) -> Result<(), StoreError> {
    MIGRATOR.run(pool).await?;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage seam of the reconciliation engine.
///
/// Every write is keyed by a stable identifier so a pass can be killed and
/// rerun at any point.
#[async_trait]
pub trait Store: Send + Sync {
    /// Stored `last_modified` of an entity, if the entity is known.
    async fn entity_last_modified(
        &self,
        kind: EntityKind,
        external_id: i64,
    ) -> StoreResult<Option<NaiveDateTime>>;
    async fn insert_entity(&self, entity: &Entity) -> StoreResult<()>;
    async fn update_entity(&self, entity: &Entity) -> StoreResult<()>;

    async fn open_tour(&self, vehicle_id: i64) -> StoreResult<Option<Tour>>;
    async fn count_tours(&self, vehicle_id: i64) -> StoreResult<i64>;
    /// Closes `previous` (if any) at the given instant and inserts `tour`,
    /// atomically.
    async fn start_tour(
        &self,
        previous: Option<(Uuid, NaiveDateTime)>,
        tour: &Tour,
    ) -> StoreResult<()>;
    async fn update_tour_status(
        &self,
        tour_id: Uuid,
        status: &str,
        updated_at: NaiveDateTime,
    ) -> StoreResult<()>;
    async fn find_tour(&self, tour_id: Uuid) -> StoreResult<Option<Tour>>;
    /// Tours still owed windows: open ones and those closed at or after
    /// `closed_since`. `None` selects every tour.
    async fn tours_due(&self, closed_since: Option<NaiveDateTime>) -> StoreResult<Vec<Tour>>;
    async fn set_last_import(&self, tour_id: Uuid, at: NaiveDateTime) -> StoreResult<()>;

    async fn upsert_activity_report(&self, report: &TruckActivityReport) -> StoreResult<Upsert>;
    async fn upsert_eco_report(&self, report: &DriverEcoMonitorReport) -> StoreResult<Upsert>;

    async fn find_retry_entry(
        &self,
        tour_id: Uuid,
        kind: ReportKind,
    ) -> StoreResult<Option<RetryQueueEntry>>;
    async fn insert_retry_entry(
        &self,
        tour_id: Uuid,
        kind: ReportKind,
        window: Window,
        reason: &str,
    ) -> StoreResult<()>;
    /// Increments the trial counter, widens the entry's range to cover
    /// `window` and records the latest reason.
    async fn bump_retry_entry(&self, id: i64, window: Window, reason: &str) -> StoreResult<()>;
    /// Entries whose window starts before `cutoff`, oldest first.
    async fn retry_entries_before(&self, cutoff: NaiveDateTime)
        -> StoreResult<Vec<RetryQueueEntry>>;
    async fn delete_retry_entry(&self, id: i64) -> StoreResult<()>;

    /// Closed tours inside `[from, to]`, optionally restricted to drivers.
    async fn closed_tours_between(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
        drivers: &[i64],
    ) -> StoreResult<Vec<Tour>>;
    async fn activity_reports_for(&self, tour_ids: &[Uuid])
        -> StoreResult<Vec<TruckActivityReport>>;
    async fn eco_reports_for(&self, tour_ids: &[Uuid]) -> StoreResult<Vec<DriverEcoMonitorReport>>;
    async fn drivers_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Driver>>;
    async fn vehicles_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Vehicle>>;
}
