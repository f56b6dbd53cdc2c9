use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_WINDOW_DAYS: u32 = 7;
pub const MAX_WINDOW_DAYS: u32 = 366;

/// Trailing query window ending on the report date.
///
/// Cost Explorer treats `start` as inclusive and `end` as exclusive, so a window built for
/// `today` returns days `today - window_days ..= today - 1`; `contains` is inclusive on both
/// ends to also accept a partial day for `today` should the API ever report one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl QueryWindow {
    pub fn trailing(report_date: NaiveDate, window_days: u32) -> anyhow::Result<Self> {
        anyhow::ensure!(
            (1..=MAX_WINDOW_DAYS).contains(&window_days),
            "window_days must be 1..={MAX_WINDOW_DAYS} (got {window_days})"
        );

        Ok(Self {
            start: report_date - Duration::days(i64::from(window_days)),
            end: report_date,
        })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

/// Billing days are UTC days, so the default report date is today's UTC date.
pub fn resolve_report_date(
    report_date_arg: Option<&str>,
    now_utc: DateTime<Utc>,
) -> anyhow::Result<NaiveDate> {
    if let Some(s) = report_date_arg {
        return Ok(NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")?);
    }

    Ok(now_utc.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn trailing_window_spans_requested_days() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 4).unwrap();
        let w = QueryWindow::trailing(today, 7).unwrap();
        assert_eq!(w.start, NaiveDate::from_ymd_opt(2026, 2, 25).unwrap());
        assert_eq!(w.end, today);
        assert_eq!(w.days(), 7);
    }

    #[test]
    fn contains_is_inclusive_on_both_ends() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        let w = QueryWindow::trailing(today, 7).unwrap();
        assert!(w.contains(NaiveDate::from_ymd_opt(2026, 1, 3).unwrap()));
        assert!(w.contains(today));
        assert!(!w.contains(NaiveDate::from_ymd_opt(2026, 1, 2).unwrap()));
        assert!(!w.contains(NaiveDate::from_ymd_opt(2026, 1, 11).unwrap()));
    }

    #[test]
    fn rejects_out_of_range_window() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        assert!(QueryWindow::trailing(today, 0).is_err());
        assert!(QueryWindow::trailing(today, MAX_WINDOW_DAYS + 1).is_err());
    }

    #[test]
    fn defaults_to_utc_date() {
        // 23:30 UTC is already the next day in most of Asia; billing follows UTC.
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 23, 30, 0).unwrap();
        let d = resolve_report_date(None, now).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2026, 1, 5).unwrap());
    }

    #[test]
    fn explicit_date_wins() {
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 12, 0, 0).unwrap();
        let d = resolve_report_date(Some("2025-12-31"), now).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
        assert!(resolve_report_date(Some("31/12/2025"), now).is_err());
    }
}
