use chrono::{Duration, NaiveDateTime};
use futures::future;
use tracing::{error, info, warn};

use super::importer::{import_window, ImportOutcome};
use super::queue::{drain, DrainOutcome};
use super::registry::{reconcile, spawn_trailer_registration, ReconcileCounts};
use super::tours::{observe, Observation, TourEvent};
use super::windows::owed_windows;
use super::{SyncContext, SyncError};
use crate::db::StoreResult;
use crate::feed::RawVehicle;
use crate::models::{Entity, ReportKind, Tour};

#[derive(Debug, Clone, Copy)]
pub struct PassOptions {
    /// Re-import every tour from its start, settled ones included.
    pub full: bool,
    /// Drain the retry queue at the end of the pass.
    pub drain: bool,
    pub settle: Duration,
    pub retry_min_age: Duration,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PassSummary {
    pub drivers: ReconcileCounts,
    pub vehicles: ReconcileCounts,
    pub tours_created: usize,
    pub tours_updated: usize,
    pub tours_imported: usize,
    pub records_written: usize,
    pub windows_deferred: usize,
    pub retries_removed: usize,
}

/// One reconciliation pass: entities, then tours, then owed report windows.
///
/// Storage failures abort only the unit they happen in (an entity, a vehicle,
/// a tour); the pass keeps going and reports the last failure at the end.
pub async fn run_import_pass(
    ctx: &SyncContext,
    now: NaiveDateTime,
    options: PassOptions,
) -> Result<PassSummary, SyncError> {
    let mut summary = PassSummary::default();
    let mut failure: Option<SyncError> = None;

    let drivers_task = tokio::spawn(reconcile_drivers(ctx.clone()));
    let vehicles_task = tokio::spawn(reconcile_vehicles(ctx.clone()));
    let (drivers, vehicles) = future::join(drivers_task, vehicles_task).await;

    match drivers {
        Ok(Ok(counts)) => {
            info!("Drivers: {}", counts);
            summary.drivers = counts;
        }
        Ok(Err(e)) => failure = Some(e.into()),
        Err(e) => failure = Some(e.into()),
    }
    let snapshots = match vehicles {
        Ok((snapshots, Ok(counts))) => {
            info!("Vehicles: {}", counts);
            summary.vehicles = counts;
            snapshots
        }
        Ok((snapshots, Err(e))) => {
            failure = Some(e.into());
            snapshots
        }
        Err(e) => {
            failure = Some(e.into());
            Vec::new()
        }
    };

    for snapshot in &snapshots {
        match observe(ctx.store.as_ref(), &Observation::from(snapshot), now).await {
            Ok(TourEvent::Created { .. }) => summary.tours_created += 1,
            Ok(TourEvent::Updated(_)) => summary.tours_updated += 1,
            Ok(_) => {}
            Err(e) => {
                error!("Tour update of vehicle {} failed: {}", snapshot.external_id, e);
                failure = Some(e.into());
            }
        }
    }

    let closed_since = if options.full {
        None
    } else {
        Some(now - options.settle)
    };
    let tours: Vec<Tour> = ctx
        .store
        .tours_due(closed_since)
        .await?
        .into_iter()
        .filter(|t| options.full || !t.is_settled(now, options.settle))
        .collect();
    let total = tours.len();
    for (i, tour) in tours.into_iter().enumerate() {
        let state = if tour.is_open() { "open" } else { "closed" };
        info!("({} / {}) importing {} tour {}", i + 1, total, state, tour.tour_id);
        let tour = if options.full {
            Tour {
                last_import: None,
                ..tour
            }
        } else {
            tour
        };
        match import_tour(ctx, &tour, now, &mut summary).await {
            Ok(()) => summary.tours_imported += 1,
            Err(e) => {
                error!("Import of tour {} failed: {}", tour.tour_id, e);
                failure = Some(e.into());
            }
        }
    }

    if options.drain {
        match drain(ctx, now, options.retry_min_age, false).await {
            Ok(results) => {
                summary.retries_removed = results
                    .iter()
                    .filter(|r| matches!(r.outcome, DrainOutcome::Removed { .. }))
                    .count();
            }
            Err(e) => failure = Some(e),
        }
    }

    info!(
        "Pass done: {} tours created, {} updated, {} imported, {} records written, {} windows deferred",
        summary.tours_created,
        summary.tours_updated,
        summary.tours_imported,
        summary.records_written,
        summary.windows_deferred
    );

    match failure {
        Some(e) => Err(e),
        None => Ok(summary),
    }
}

/// Imports every owed window of a tour, then stamps the tour. Deferred
/// windows are the queue's business and do not hold the stamp back.
async fn import_tour(
    ctx: &SyncContext,
    tour: &Tour,
    now: NaiveDateTime,
    summary: &mut PassSummary,
) -> StoreResult<()> {
    for window in owed_windows(tour, now) {
        for kind in [ReportKind::Activity, ReportKind::EcoMonitor] {
            match import_window(ctx, tour, kind, window).await? {
                ImportOutcome::Written(n) => summary.records_written += n,
                ImportOutcome::Deferred(_) => summary.windows_deferred += 1,
                ImportOutcome::Skipped => {}
            }
        }
    }
    ctx.store.set_last_import(tour.tour_id, now).await
}

async fn reconcile_drivers(ctx: SyncContext) -> StoreResult<ReconcileCounts> {
    let drivers = match ctx.feed.fetch_drivers().await {
        Ok(response) => {
            response.log_notices("driver list");
            response.items
        }
        Err(e) => {
            warn!("Driver list unavailable: {}", e);
            Vec::new()
        }
    };
    ctx.pace().await;

    let entities: Vec<Entity> = drivers.iter().map(|d| d.to_driver().into()).collect();
    reconcile(ctx.store.as_ref(), &entities).await
}

async fn reconcile_vehicles(ctx: SyncContext) -> (Vec<RawVehicle>, StoreResult<ReconcileCounts>) {
    let vehicles = match ctx.feed.fetch_vehicles().await {
        Ok(response) => {
            response.log_notices("vehicle list");
            response.items
        }
        Err(e) => {
            warn!("Vehicle list unavailable: {}", e);
            Vec::new()
        }
    };
    ctx.pace().await;

    for trailer in vehicles.iter().filter_map(|v| v.trailer.as_ref()) {
        spawn_trailer_registration(ctx.store.clone(), trailer.to_trailer());
    }

    let entities: Vec<Entity> = vehicles.iter().map(|v| v.to_vehicle().into()).collect();
    let counts = reconcile(ctx.store.as_ref(), &entities).await;
    (vehicles, counts)
}
