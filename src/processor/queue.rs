use chrono::{Duration, NaiveDateTime};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::importer::{import_window, ImportOutcome};
use super::{SyncContext, SyncError};
use crate::db::{Store, StoreError, StoreResult};
use crate::models::{ReportKind, RetryQueueEntry, Window};

/// Records that `window` must be fetched again. A second failure for the same
/// (tour, kind) bumps the trial counter and widens the entry to cover both
/// windows.
pub async fn enqueue(
    store: &dyn Store,
    tour_id: Uuid,
    kind: ReportKind,
    window: Window,
    reason: &str,
) -> StoreResult<()> {
    match store.find_retry_entry(tour_id, kind).await? {
        None => {
            store.insert_retry_entry(tour_id, kind, window, reason).await?;
            info!("Queued {} import of tour {} from {}: {}", kind, tour_id, window.start, reason);
        }
        Some(entry) => {
            store.bump_retry_entry(entry.id, window, reason).await?;
            info!(
                "Retry of {} import of tour {} failed again (trial {}): {}",
                kind,
                tour_id,
                entry.trial + 1,
                reason
            );
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Re-imported and removed from the queue.
    Removed { written: usize },
    /// Re-imported, but the entry was re-enqueued meanwhile and stays.
    Contended,
    /// The upstream still fails for at least one day; the entry stays with a
    /// bumped trial.
    Deferred(String),
    /// The referenced tour is gone; the entry stays.
    MissingTour,
    /// The report can never be fetched for the tour (an eco report without a
    /// driver); the entry is dropped.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainResult {
    pub entry_id: i64,
    pub tour_id: Uuid,
    pub kind: ReportKind,
    pub outcome: DrainOutcome,
}

/// Retries every queued entry whose range started more than `older_than`
/// ago, oldest first.
///
/// With `handle_error` set the first failure (storage or upstream) ends the
/// drain and is returned. Otherwise upstream failures are logged and the
/// drain moves on; a storage failure leaves its entry queued and the last one
/// is returned once every entry was tried.
pub async fn drain(
    ctx: &SyncContext,
    now: NaiveDateTime,
    older_than: Duration,
    handle_error: bool,
) -> Result<Vec<DrainResult>, SyncError> {
    let cutoff = now - older_than;
    let entries = ctx.store.retry_entries_before(cutoff).await?;
    let total = entries.len();
    info!("Draining {} retry entries queued before {}", total, cutoff);

    let mut results = Vec::with_capacity(total);
    let mut failure: Option<StoreError> = None;
    for (i, entry) in entries.into_iter().enumerate() {
        debug!(
            "({} / {}) retrying {} import of tour {} from {} to {} (trial {})",
            i + 1,
            total,
            entry.kind,
            entry.tour_id,
            entry.import_from,
            entry.import_to,
            entry.trial
        );
        let outcome = match retry_entry(ctx, &entry).await {
            Ok(DrainOutcome::Deferred(reason)) if handle_error => {
                return Err(SyncError::Deferred {
                    tour_id: entry.tour_id,
                    kind: entry.kind,
                    reason,
                });
            }
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Retry of tour {} ({}) failed: {}", entry.tour_id, entry.kind, e);
                if handle_error {
                    return Err(e.into());
                }
                failure = Some(e);
                continue;
            }
        };
        results.push(DrainResult {
            entry_id: entry.id,
            tour_id: entry.tour_id,
            kind: entry.kind,
            outcome,
        });
    }

    match failure {
        Some(e) => Err(e.into()),
        None => Ok(results),
    }
}

async fn retry_entry(ctx: &SyncContext, entry: &RetryQueueEntry) -> StoreResult<DrainOutcome> {
    let Some(tour) = ctx.store.find_tour(entry.tour_id).await? else {
        warn!("Tour {} of retry entry {} not found", entry.tour_id, entry.id);
        return Ok(DrainOutcome::MissingTour);
    };

    let mut written = 0;
    let mut deferred = None;
    for window in entry.windows() {
        match import_window(ctx, &tour, entry.kind, window).await? {
            ImportOutcome::Written(n) => written += n,
            ImportOutcome::Deferred(reason) => deferred = Some(reason),
            ImportOutcome::Skipped => {
                ctx.store.delete_retry_entry(entry.id).await?;
                info!(
                    "Dropped retry entry {}: no {} report exists for tour {}",
                    entry.id, entry.kind, entry.tour_id
                );
                return Ok(DrainOutcome::Skipped);
            }
        }
    }
    if let Some(reason) = deferred {
        return Ok(DrainOutcome::Deferred(reason));
    }

    // a pass may have re-enqueued the same (tour, kind) while fetching
    match ctx.store.find_retry_entry(entry.tour_id, entry.kind).await? {
        Some(current) if current.trial == entry.trial => {
            ctx.store.delete_retry_entry(current.id).await?;
            info!("Retry of {} import of tour {} done", entry.kind, entry.tour_id);
            Ok(DrainOutcome::Removed { written })
        }
        Some(current) => {
            info!(
                "Retry entry of tour {} ({}) changed to trial {} meanwhile, keeping it",
                entry.tour_id, entry.kind, current.trial
            );
            Ok(DrainOutcome::Contended)
        }
        None => Ok(DrainOutcome::Removed { written }),
    }
}
