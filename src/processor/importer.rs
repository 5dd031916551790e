use tracing::{debug, info, warn};

use super::queue::enqueue;
use super::SyncContext;
use crate::db::StoreResult;
use crate::feed::{FeedError, FeedResponse};
use crate::models::{ReportKind, Tour, Upsert, Window, REASON_NO_DATA};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// Records written (inserted or updated) for the window.
    Written(usize),
    /// Nothing written; the window now sits in the retry queue.
    Deferred(String),
    /// The report cannot be asked for this tour at all.
    Skipped,
}

/// Fetches one day window of one report kind for a tour and upserts the
/// records falling inside the tour.
///
/// Upstream trouble never surfaces as an error here: the window is queued for
/// a later retry instead. Only storage failures are returned.
pub async fn import_window(
    ctx: &SyncContext,
    tour: &Tour,
    kind: ReportKind,
    day: Window,
) -> StoreResult<ImportOutcome> {
    let window = day.for_kind(kind);
    let context = format!("{} report of tour {} from {}", kind, tour.tour_id, window.start);

    let written = match kind {
        ReportKind::Activity => {
            let response = ctx
                .feed
                .fetch_activity_report(tour.vehicle_id, window)
                .await;
            ctx.pace().await;
            match triage(response, &context) {
                Ok(records) => {
                    let mut written = 0;
                    for report in records.iter().map(|r| r.to_report(tour.tour_id, tour.vehicle_id)) {
                        if !tour.contains(report.start_time, report.end_time) {
                            continue;
                        }
                        let upsert = ctx.store.upsert_activity_report(&report).await?;
                        log_upsert(upsert, kind, &report.start_time.to_string());
                        written += 1;
                    }
                    written
                }
                Err(reason) => return defer(ctx, tour, kind, day, reason).await,
            }
        }
        ReportKind::EcoMonitor => {
            let Some(driver_id) = tour.driver_id else {
                debug!("Tour {} has no driver, no eco report to fetch", tour.tour_id);
                return Ok(ImportOutcome::Skipped);
            };
            let response = ctx.feed.fetch_eco_report(driver_id, window).await;
            ctx.pace().await;
            match triage(response, &context) {
                Ok(records) => {
                    let mut written = 0;
                    for report in records.iter().map(|r| r.to_report(tour.tour_id, driver_id)) {
                        if !tour.contains(report.start_time, report.end_time) {
                            continue;
                        }
                        let upsert = ctx.store.upsert_eco_report(&report).await?;
                        log_upsert(upsert, kind, &report.start_time.to_string());
                        written += 1;
                    }
                    written
                }
                Err(reason) => return defer(ctx, tour, kind, day, reason).await,
            }
        }
    };

    info!("{}: {} records written", context, written);
    Ok(ImportOutcome::Written(written))
}

/// Splits a provider answer into usable records or a retry reason.
fn triage<T>(response: Result<FeedResponse<T>, FeedError>, context: &str) -> Result<Vec<T>, String> {
    let response = match response {
        Ok(r) => r,
        Err(e) => {
            warn!("{}: {}", context, e);
            return Err(e.to_string());
        }
    };
    response.log_notices(context);
    if let Some(error) = response.error {
        return Err(error.code);
    }
    if response.items.is_empty() {
        return Err(REASON_NO_DATA.to_string());
    }
    Ok(response.items)
}

async fn defer(
    ctx: &SyncContext,
    tour: &Tour,
    kind: ReportKind,
    day: Window,
    reason: String,
) -> StoreResult<ImportOutcome> {
    enqueue(ctx.store.as_ref(), tour.tour_id, kind, day, &reason).await?;
    Ok(ImportOutcome::Deferred(reason))
}

fn log_upsert(upsert: Upsert, kind: ReportKind, start: &str) {
    match upsert {
        Upsert::Inserted => debug!("Inserted {} record starting {}", kind, start),
        Upsert::Updated => debug!("Updated {} record starting {}", kind, start),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::feed::scripted::ScriptedFeed;
    use crate::feed::{FeedNotice, RawActivityRecord, RawEcoRecord};
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use std::sync::Arc;
    use uuid::Uuid;

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 8, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn fmt(at: NaiveDateTime) -> String {
        at.format("%Y-%m-%dT%H:%M:%S").to_string()
    }

    fn tour(end_time: Option<NaiveDateTime>) -> Tour {
        Tour {
            tour_id: Uuid::new_v4(),
            vehicle_id: 300,
            driver_id: Some(30),
            trailer_id: None,
            destination_longitude: 5.0,
            destination_latitude: 52.0,
            status: String::new(),
            start_time: t0(),
            end_time,
            last_import: None,
            updated_at: t0(),
        }
    }

    fn activity(start_hours: i64, end_hours: i64, km: i32) -> RawActivityRecord {
        RawActivityRecord {
            begin: fmt(t0() + Duration::hours(start_hours)),
            end: fmt(t0() + Duration::hours(end_hours)),
            km_begin: km,
            km_end: km + 50,
            country_code: "NL".to_string(),
            ..Default::default()
        }
    }

    fn setup() -> (Arc<MemoryStore>, Arc<ScriptedFeed>, SyncContext) {
        let store = Arc::new(MemoryStore::new());
        let feed = Arc::new(ScriptedFeed::new());
        let ctx = SyncContext::new(store.clone(), feed.clone(), std::time::Duration::ZERO);
        (store, feed, ctx)
    }

    #[tokio::test]
    async fn test_repeated_import_is_idempotent() {
        let (store, feed, ctx) = setup();
        let t = tour(None);
        let records = vec![activity(1, 2, 100), activity(3, 5, 150)];
        feed.push_activity(Ok(FeedResponse::with_items(records.clone())));
        feed.push_activity(Ok(FeedResponse::with_items(records)));

        let first = import_window(&ctx, &t, ReportKind::Activity, Window::day(t0()))
            .await
            .unwrap();
        let snapshot = store.activity_reports();
        let second = import_window(&ctx, &t, ReportKind::Activity, Window::day(t0()))
            .await
            .unwrap();

        assert_eq!(first, ImportOutcome::Written(2));
        assert_eq!(second, ImportOutcome::Written(2));
        assert_eq!(store.activity_reports(), snapshot);
        assert_eq!(snapshot.len(), 2);
        assert!(store.retry_entries().is_empty());
    }

    #[tokio::test]
    async fn test_refetch_updates_in_place() {
        let (store, feed, ctx) = setup();
        let t = tour(None);
        feed.push_activity(Ok(FeedResponse::with_items(vec![activity(1, 2, 100)])));
        feed.push_activity(Ok(FeedResponse::with_items(vec![activity(1, 3, 100)])));

        import_window(&ctx, &t, ReportKind::Activity, Window::day(t0())).await.unwrap();
        import_window(&ctx, &t, ReportKind::Activity, Window::day(t0())).await.unwrap();

        let reports = store.activity_reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].end_time, t0() + Duration::hours(3));
    }

    #[tokio::test]
    async fn test_empty_answer_enqueues_once() {
        let (store, _feed, ctx) = setup();
        let t = tour(None);

        let outcome = import_window(&ctx, &t, ReportKind::Activity, Window::day(t0()))
            .await
            .unwrap();

        assert_eq!(outcome, ImportOutcome::Deferred(REASON_NO_DATA.to_string()));
        assert!(store.activity_reports().is_empty());
        let entries = store.retry_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].reason, "no data found");
        assert_eq!(entries[0].kind, ReportKind::Activity);
        assert_eq!(entries[0].import_from, t0());
        assert_eq!(entries[0].import_to, t0() + Duration::days(1));
        assert_eq!(entries[0].trial, 0);
    }

    #[tokio::test]
    async fn test_upstream_error_writes_nothing() {
        let (store, feed, ctx) = setup();
        let t = tour(None);
        feed.push_eco(Ok(FeedResponse {
            items: vec![RawEcoRecord {
                begin: fmt(t0() + Duration::hours(1)),
                end: fmt(t0() + Duration::hours(2)),
                distance: 80.0,
                ..Default::default()
            }],
            error: Some(FeedNotice {
                code: "NO_RIGHTS".to_string(),
                message: "not allowed".to_string(),
            }),
            warning: None,
        }));
        feed.push_activity(Err(FeedError::Status(503)));

        let eco = import_window(&ctx, &t, ReportKind::EcoMonitor, Window::day(t0()))
            .await
            .unwrap();
        let activity = import_window(&ctx, &t, ReportKind::Activity, Window::day(t0()))
            .await
            .unwrap();

        assert_eq!(eco, ImportOutcome::Deferred("NO_RIGHTS".to_string()));
        assert!(matches!(activity, ImportOutcome::Deferred(_)));
        assert!(store.eco_reports().is_empty());
        assert!(store.activity_reports().is_empty());
        assert_eq!(store.retry_entries().len(), 2);
    }

    #[tokio::test]
    async fn test_records_outside_tour_are_dropped() {
        let (store, feed, ctx) = setup();
        let t = tour(Some(t0() + Duration::hours(10)));
        feed.push_activity(Ok(FeedResponse::with_items(vec![
            activity(-2, 1, 10),
            activity(2, 4, 20),
            activity(9, 11, 30),
            RawActivityRecord {
                begin: "not a date".to_string(),
                ..activity(5, 6, 40)
            },
        ])));

        let outcome = import_window(&ctx, &t, ReportKind::Activity, Window::day(t0()))
            .await
            .unwrap();

        assert_eq!(outcome, ImportOutcome::Written(1));
        assert_eq!(store.activity_reports()[0].km_begin, 20);
    }

    #[tokio::test]
    async fn test_eco_window_is_widened() {
        let (_store, feed, ctx) = setup();
        let t = tour(None);

        import_window(&ctx, &t, ReportKind::EcoMonitor, Window::day(t0()))
            .await
            .unwrap();

        let requests = feed.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, ReportKind::EcoMonitor);
        assert_eq!(requests[0].1, 30);
        assert_eq!(requests[0].2.start, t0() - Duration::days(1));
        assert_eq!(requests[0].2.end, t0() + Duration::days(2));
    }

    #[tokio::test]
    async fn test_storage_failure_is_returned() {
        let (store, feed, ctx) = setup();
        store.fail_report_writes();
        feed.push_activity(Ok(FeedResponse::with_items(vec![activity(1, 2, 100)])));

        let result = import_window(&ctx, &tour(None), ReportKind::Activity, Window::day(t0())).await;
        assert!(result.is_err());
    }
}
