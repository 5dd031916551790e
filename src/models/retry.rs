use chrono::{Duration, NaiveDateTime};
use uuid::Uuid;

use super::report::ReportKind;
use super::window::Window;

pub const REASON_NO_DATA: &str = "no data found";

/// One outstanding obligation to re-fetch the windows of a tour.
///
/// Failures of the same (tour, kind) share an entry whose range grows to
/// cover every failed day.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryQueueEntry {
    pub id: i64,
    pub tour_id: Uuid,
    pub kind: ReportKind,
    pub import_from: NaiveDateTime, // start of the earliest failed day
    pub import_to: NaiveDateTime,   // end of the latest failed day
    pub reason: String,
    pub trial: i32,
}

impl RetryQueueEntry {
    /// Day windows covering `[import_from, import_to)`, oldest first.
    pub fn windows(&self) -> Vec<Window> {
        let mut windows = Vec::new();
        let mut start = self.import_from;
        loop {
            windows.push(Window::day(start));
            start += Duration::days(1);
            if start >= self.import_to {
                break;
            }
        }
        windows
    }
}
