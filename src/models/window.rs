use chrono::{Duration, NaiveDateTime};

use super::report::ReportKind;

/// Half-open fetch interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Window {
    pub fn day(start: NaiveDateTime) -> Self {
        Self {
            start,
            end: start + Duration::days(1),
        }
    }

    /// Eco-monitor sessions run from contact on to contact off and can cross
    /// the day boundary, so that feed is asked for one extra day on each side.
    pub fn for_kind(&self, kind: ReportKind) -> Self {
        match kind {
            ReportKind::Activity => *self,
            ReportKind::EcoMonitor => Self {
                start: self.start - Duration::days(1),
                end: self.end + Duration::days(1),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_eco_window_is_widened_by_a_day_each_side() {
        let start = NaiveDate::from_ymd_opt(2024, 5, 10)
            .unwrap()
            .and_hms_opt(6, 30, 0)
            .unwrap();
        let day = Window::day(start);

        assert_eq!(day.for_kind(ReportKind::Activity), day);

        let eco = day.for_kind(ReportKind::EcoMonitor);
        assert_eq!(eco.start, start - Duration::days(1));
        assert_eq!(eco.end, start + Duration::days(2));
    }
}
