use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::FromRow;
use uuid::Uuid;

use super::{queries, DbPool, Store, StoreError, StoreResult};
use crate::models::{
    Driver, DriverEcoMonitorReport, Entity, EntityKind, ReportKind, RetryQueueEntry, Tour,
    TruckActivityReport, Upsert, Vehicle, Window,
};

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct RetryRow {
    id: i64,
    tour_id: Uuid,
    report_kind: String,
    import_from: NaiveDateTime,
    import_to: NaiveDateTime,
    reason: String,
    trial: i32,
}

impl TryFrom<RetryRow> for RetryQueueEntry {
    type Error = StoreError;

    fn try_from(row: RetryRow) -> Result<Self, Self::Error> {
        let kind = row
            .report_kind
            .parse::<ReportKind>()
            .map_err(|e| StoreError::Corrupt(format!("retry entry {}: {}", row.id, e)))?;
        Ok(RetryQueueEntry {
            id: row.id,
            tour_id: row.tour_id,
            kind,
            import_from: row.import_from,
            import_to: row.import_to,
            reason: row.reason,
            trial: row.trial,
        })
    }
}

fn upsert_result(inserted: bool) -> Upsert {
    if inserted {
        Upsert::Inserted
    } else {
        Upsert::Updated
    }
}

#[async_trait]
impl Store for PgStore {
    async fn entity_last_modified(
        &self,
        kind: EntityKind,
        external_id: i64,
    ) -> StoreResult<Option<NaiveDateTime>> {
        let query = match kind {
            EntityKind::Driver => queries::SELECT_DRIVER_LAST_MODIFIED,
            EntityKind::Vehicle => queries::SELECT_VEHICLE_LAST_MODIFIED,
            EntityKind::Trailer => queries::SELECT_TRAILER_LAST_MODIFIED,
        };
        let last_modified = sqlx::query_scalar::<_, NaiveDateTime>(query)
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(last_modified)
    }

    async fn insert_entity(&self, entity: &Entity) -> StoreResult<()> {
        match entity {
            Entity::Driver(d) => {
                sqlx::query(queries::INSERT_DRIVER)
                    .bind(d.external_id)
                    .bind(&d.person_id)
                    .bind(&d.name)
                    .bind(&d.language)
                    .bind(d.inactive)
                    .bind(d.last_modified)
                    .execute(&self.pool)
                    .await?;
            }
            Entity::Vehicle(v) => {
                sqlx::query(queries::INSERT_VEHICLE)
                    .bind(v.external_id)
                    .bind(&v.license_plate)
                    .bind(&v.group_name)
                    .bind(v.inactive)
                    .bind(v.last_modified)
                    .execute(&self.pool)
                    .await?;
            }
            Entity::Trailer(t) => {
                sqlx::query(queries::INSERT_TRAILER)
                    .bind(t.external_id)
                    .bind(&t.license_plate)
                    .bind(t.inactive)
                    .bind(t.last_modified)
                    .execute(&self.pool)
                    .await?;
            }
        }
        Ok(())
    }

    async fn update_entity(&self, entity: &Entity) -> StoreResult<()> {
        match entity {
            Entity::Driver(d) => {
                sqlx::query(queries::UPDATE_DRIVER)
                    .bind(d.external_id)
                    .bind(&d.person_id)
                    .bind(&d.name)
                    .bind(&d.language)
                    .bind(d.inactive)
                    .bind(d.last_modified)
                    .execute(&self.pool)
                    .await?;
            }
            Entity::Vehicle(v) => {
                sqlx::query(queries::UPDATE_VEHICLE)
                    .bind(v.external_id)
                    .bind(&v.license_plate)
                    .bind(&v.group_name)
                    .bind(v.inactive)
                    .bind(v.last_modified)
                    .execute(&self.pool)
                    .await?;
            }
            Entity::Trailer(t) => {
                sqlx::query(queries::UPDATE_TRAILER)
                    .bind(t.external_id)
                    .bind(&t.license_plate)
                    .bind(t.inactive)
                    .bind(t.last_modified)
                    .execute(&self.pool)
                    .await?;
            }
        }
        Ok(())
    }

    async fn open_tour(&self, vehicle_id: i64) -> StoreResult<Option<Tour>> {
        let sql = queries::select_tours(queries::WHERE_OPEN_TOUR);
        let tour = sqlx::query_as::<_, Tour>(&sql)
            .bind(vehicle_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tour)
    }

    async fn count_tours(&self, vehicle_id: i64) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(queries::COUNT_TOURS_FOR_VEHICLE)
            .bind(vehicle_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn start_tour(
        &self,
        previous: Option<(Uuid, NaiveDateTime)>,
        tour: &Tour,
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        if let Some((previous_id, end_time)) = previous {
            sqlx::query(queries::CLOSE_TOUR)
                .bind(previous_id)
                .bind(end_time)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query(queries::INSERT_TOUR)
            .bind(tour.tour_id)
            .bind(tour.vehicle_id)
            .bind(tour.driver_id)
            .bind(tour.trailer_id)
            .bind(tour.destination_longitude)
            .bind(tour.destination_latitude)
            .bind(&tour.status)
            .bind(tour.start_time)
            .bind(tour.end_time)
            .bind(tour.last_import)
            .bind(tour.updated_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn update_tour_status(
        &self,
        tour_id: Uuid,
        status: &str,
        updated_at: NaiveDateTime,
    ) -> StoreResult<()> {
        sqlx::query(queries::UPDATE_TOUR_STATUS)
            .bind(tour_id)
            .bind(status)
            .bind(updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_tour(&self, tour_id: Uuid) -> StoreResult<Option<Tour>> {
        let sql = queries::select_tours(queries::WHERE_TOUR_ID);
        let tour = sqlx::query_as::<_, Tour>(&sql)
            .bind(tour_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tour)
    }

    async fn tours_due(&self, closed_since: Option<NaiveDateTime>) -> StoreResult<Vec<Tour>> {
        let tours = match closed_since {
            Some(cutoff) => {
                let sql = queries::select_tours(queries::WHERE_TOUR_DUE);
                sqlx::query_as::<_, Tour>(&sql)
                    .bind(cutoff)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = queries::select_tours(queries::ORDER_ALL_TOURS);
                sqlx::query_as::<_, Tour>(&sql).fetch_all(&self.pool).await?
            }
        };
        Ok(tours)
    }

    async fn set_last_import(&self, tour_id: Uuid, at: NaiveDateTime) -> StoreResult<()> {
        sqlx::query(queries::UPDATE_TOUR_LAST_IMPORT)
            .bind(tour_id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn upsert_activity_report(&self, report: &TruckActivityReport) -> StoreResult<Upsert> {
        let inserted = sqlx::query_scalar::<_, bool>(queries::UPSERT_ACTIVITY_REPORT)
            .bind(report.tour_id)
            .bind(report.vehicle_id)
            .bind(report.km_begin)
            .bind(report.km_end)
            .bind(report.consumption)
            .bind(&report.loaded_status)
            .bind(&report.activity)
            .bind(report.speed_avg)
            .bind(report.longitude)
            .bind(report.latitude)
            .bind(&report.address_info)
            .bind(&report.country_code)
            .bind(&report.reference)
            .bind(report.start_time)
            .bind(report.end_time)
            .fetch_one(&self.pool)
            .await?;
        Ok(upsert_result(inserted))
    }

    async fn upsert_eco_report(&self, report: &DriverEcoMonitorReport) -> StoreResult<Upsert> {
        let inserted = sqlx::query_scalar::<_, bool>(queries::UPSERT_ECO_REPORT)
            .bind(report.tour_id)
            .bind(report.driver_id)
            .bind(report.distance)
            .bind(report.duration_driving)
            .bind(report.fuel_consumption)
            .bind(report.fuel_consumption_average)
            .bind(report.rpm_average)
            .bind(report.emission_average)
            .bind(report.speed_average)
            .bind(report.fuel_consumption_idling)
            .bind(report.duration_idling)
            .bind(report.number_idling)
            .bind(report.duration_over_speeding)
            .bind(report.number_over_speeding)
            .bind(report.distance_coasting)
            .bind(report.duration_coasting)
            .bind(report.number_of_stops)
            .bind(report.number_of_brakes)
            .bind(report.number_of_panic_brakes)
            .bind(report.number_of_harsh_accelerations)
            .bind(report.number_of_gear_changes)
            .bind(report.distance_on_cruise_control)
            .bind(report.duration_on_cruise_control)
            .bind(report.start_time)
            .bind(report.end_time)
            .fetch_one(&self.pool)
            .await?;
        Ok(upsert_result(inserted))
    }

    async fn find_retry_entry(
        &self,
        tour_id: Uuid,
        kind: ReportKind,
    ) -> StoreResult<Option<RetryQueueEntry>> {
        let row = sqlx::query_as::<_, RetryRow>(queries::SELECT_RETRY_ENTRY)
            .bind(tour_id)
            .bind(kind.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(RetryQueueEntry::try_from).transpose()
    }

    async fn insert_retry_entry(
        &self,
        tour_id: Uuid,
        kind: ReportKind,
        window: Window,
        reason: &str,
    ) -> StoreResult<()> {
        sqlx::query(queries::INSERT_RETRY_ENTRY)
            .bind(tour_id)
            .bind(kind.as_str())
            .bind(window.start)
            .bind(window.end)
            .bind(reason)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn bump_retry_entry(&self, id: i64, window: Window, reason: &str) -> StoreResult<()> {
        sqlx::query(queries::BUMP_RETRY_ENTRY)
            .bind(id)
            .bind(window.start)
            .bind(window.end)
            .bind(reason)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn retry_entries_before(
        &self,
        cutoff: NaiveDateTime,
    ) -> StoreResult<Vec<RetryQueueEntry>> {
        let rows = sqlx::query_as::<_, RetryRow>(queries::SELECT_RETRY_ENTRIES_BEFORE)
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(RetryQueueEntry::try_from).collect()
    }

    async fn delete_retry_entry(&self, id: i64) -> StoreResult<()> {
        sqlx::query(queries::DELETE_RETRY_ENTRY)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn closed_tours_between(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
        drivers: &[i64],
    ) -> StoreResult<Vec<Tour>> {
        let tours = if drivers.is_empty() {
            let sql = queries::select_tours(queries::WHERE_CLOSED_BETWEEN);
            sqlx::query_as::<_, Tour>(&sql)
                .bind(from)
                .bind(to)
                .fetch_all(&self.pool)
                .await?
        } else {
            let sql = queries::select_tours(queries::WHERE_CLOSED_BETWEEN_FOR_DRIVERS);
            sqlx::query_as::<_, Tour>(&sql)
                .bind(from)
                .bind(to)
                .bind(drivers.to_vec())
                .fetch_all(&self.pool)
                .await?
        };
        Ok(tours)
    }

    async fn activity_reports_for(
        &self,
        tour_ids: &[Uuid],
    ) -> StoreResult<Vec<TruckActivityReport>> {
        let reports = sqlx::query_as::<_, TruckActivityReport>(
            queries::SELECT_ACTIVITY_REPORTS_FOR_TOURS,
        )
        .bind(tour_ids.to_vec())
        .fetch_all(&self.pool)
        .await?;
        Ok(reports)
    }

    async fn eco_reports_for(&self, tour_ids: &[Uuid]) -> StoreResult<Vec<DriverEcoMonitorReport>> {
        let reports =
            sqlx::query_as::<_, DriverEcoMonitorReport>(queries::SELECT_ECO_REPORTS_FOR_TOURS)
                .bind(tour_ids.to_vec())
                .fetch_all(&self.pool)
                .await?;
        Ok(reports)
    }

    async fn drivers_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Driver>> {
        let drivers = sqlx::query_as::<_, Driver>(queries::SELECT_DRIVERS_BY_IDS)
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await?;
        Ok(drivers)
    }

    async fn vehicles_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Vehicle>> {
        let vehicles = sqlx::query_as::<_, Vehicle>(queries::SELECT_VEHICLES_BY_IDS)
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await?;
        Ok(vehicles)
    }
}
