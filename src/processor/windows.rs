use chrono::{Duration, NaiveDateTime};

use crate::models::{Tour, Window};

/// Day windows a tour still owes, oldest first.
///
/// A tour never reconciled owes its whole lifetime, counted from its start.
pub fn owed_windows(tour: &Tour, now: NaiveDateTime) -> Vec<Window> {
    let from = tour.last_import.unwrap_or(tour.start_time);
    if now < from {
        return Vec::new();
    }
    let elapsed_days = (now - from).num_hours() / 24;
    (0..=elapsed_days)
        .map(|k| Window::day(from + Duration::days(k)))
        .collect()
}
