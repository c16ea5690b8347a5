use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use kopontren_core::{DomainError, DomainResult};

/// Longest range a report accepts (about ten years).
pub const MAX_RANGE_DAYS: i64 = 3_660;

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> DomainResult<Self> {
        if end < start {
            return Err(DomainError::validation("end date is before the start date"));
        }
        let range = Self { start, end };
        if range.days() > MAX_RANGE_DAYS {
            return Err(DomainError::validation(format!(
                "date range is longer than {MAX_RANGE_DAYS} days"
            )));
        }
        // Reports compare against the previous period, which must be a real date range too.
        if start.checked_sub_signed(Duration::days(range.days())).is_none() {
            return Err(DomainError::validation("start date is out of range"));
        }
        Ok(range)
    }

    pub fn day(date: NaiveDate) -> Self {
        Self { start: date, end: date }
    }

    /// First day of `date`'s month up to `date`.
    pub fn month_to_date(date: NaiveDate) -> Self {
        Self {
            start: date.with_day(1).unwrap_or(date),
            end: date,
        }
    }

    /// Number of days, both ends included.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// The equal-length period ending the day before `start`.
    ///
    /// Saturates at the earliest representable date; [`DateRange::new`] rejects ranges
    /// where that would happen.
    pub fn previous(&self) -> Self {
        let end = self
            .start
            .checked_sub_signed(Duration::days(1))
            .unwrap_or(NaiveDate::MIN);
        let start = end
            .checked_sub_signed(Duration::days(self.days() - 1))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end }
    }

    /// `(year, month)` of every calendar month the range touches, in order.
    pub fn months(&self) -> Vec<(i32, u32)> {
        let mut out = Vec::new();
        let (mut y, mut m) = (self.start.year(), self.start.month());
        let last = (self.end.year(), self.end.month());
        loop {
            out.push((y, m));
            if (y, m) >= last {
                break;
            }
            if m == 12 {
                y += 1;
                m = 1;
            } else {
                m += 1;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn rejects_inverted_range() {
        assert!(DateRange::new(d(2026, 3, 2), d(2026, 3, 1)).is_err());
    }

    #[test]
    fn previous_is_equal_length_and_adjacent() {
        let r = DateRange::new(d(2026, 3, 1), d(2026, 3, 31)).unwrap();
        let p = r.previous();
        assert_eq!(p.end, d(2026, 2, 28));
        assert_eq!(p.days(), 31);
        assert_eq!(p.start, d(2026, 1, 29));

        let one = DateRange::day(d(2026, 1, 1)).previous();
        assert_eq!((one.start, one.end), (d(2025, 12, 31), d(2025, 12, 31)));
    }

    #[test]
    fn rejects_ranges_at_the_edge_of_the_calendar() {
        let first = NaiveDate::MIN;
        assert!(DateRange::new(first, first).is_err());
        assert!(DateRange::new(first, first + Duration::days(30)).is_err());

        // Built by hand, bypassing `new`: still no panic.
        let p = DateRange::day(first).previous();
        assert_eq!((p.start, p.end), (NaiveDate::MIN, NaiveDate::MIN));
    }

    #[test]
    fn rejects_overlong_ranges() {
        assert!(DateRange::new(d(2000, 1, 1), d(2026, 1, 1)).is_err());
        assert!(DateRange::new(d(-262_000, 1, 1), d(262_000, 1, 1)).is_err());

        let longest = DateRange::new(d(2020, 1, 1), d(2020, 1, 1) + Duration::days(MAX_RANGE_DAYS - 1)).unwrap();
        assert_eq!(longest.days(), MAX_RANGE_DAYS);
        assert!(longest.months().len() <= 121);
    }

    #[test]
    fn months_cross_year_boundary() {
        let r = DateRange::new(d(2025, 11, 15), d(2026, 2, 3)).unwrap();
        assert_eq!(r.months(), vec![(2025, 11), (2025, 12), (2026, 1), (2026, 2)]);
        assert_eq!(DateRange::day(d(2026, 5, 5)).months(), vec![(2026, 5)]);
    }

    #[test]
    fn month_to_date_starts_on_the_first() {
        let r = DateRange::month_to_date(d(2026, 3, 17));
        assert_eq!(r.start, d(2026, 3, 1));
        assert_eq!(r.days(), 17);
    }
}
