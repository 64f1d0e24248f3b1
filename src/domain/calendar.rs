//! Service calendars.
//!
//! A GTFS service is a date predicate: a weekday mask bounded by a date
//! range, refined by per-date exceptions. A trip runs on a date exactly
//! when its service is active there.

use chrono::{Datelike, NaiveDate};

/// A service's regular schedule from `calendar.txt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Calendar {
    /// Active weekdays, Monday first.
    pub weekdays: [bool; 7],
    /// First date of validity (inclusive).
    pub start: NaiveDate,
    /// Last date of validity (inclusive).
    pub end: NaiveDate,
}

impl Calendar {
    /// Is the service regularly active on `date`, before exceptions?
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.start <= date
            && date <= self.end
            && self.weekdays[date.weekday().num_days_from_monday() as usize]
    }
}

/// A per-date exception from `calendar_dates.txt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionType {
    /// Service additionally runs on the date (`exception_type` 1).
    Added,
    /// Service does not run on the date (`exception_type` 2).
    Removed,
}

impl ExceptionType {
    /// Maps the raw GTFS `exception_type` value.
    pub fn from_gtfs(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(ExceptionType::Added),
            2 => Some(ExceptionType::Removed),
            _ => None,
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    prop_compose! {
        fn arb_date()(
            year in 2020i32..2030,
            month in 1u32..=12,
            day in 1u32..=28
        ) -> NaiveDate {
            NaiveDate::from_ymd_opt(year, month, day).unwrap()
        }
    }

    proptest! {
        /// A calendar with every weekday set is active exactly on its range.
        #[test]
        fn full_mask_means_range_check(d in arb_date(), start in arb_date(), end in arb_date()) {
            let cal = Calendar { weekdays: [true; 7], start, end };
            prop_assert_eq!(cal.is_active_on(d), start <= d && d <= end);
        }

        /// A calendar with no weekday set is never active.
        #[test]
        fn empty_mask_never_active(d in arb_date(), start in arb_date(), end in arb_date()) {
            let cal = Calendar { weekdays: [false; 7], start, end };
            prop_assert!(!cal.is_active_on(d));
        }

        /// Only the bit for the date's own weekday matters.
        #[test]
        fn single_weekday_mask(d in arb_date(), bit in 0usize..7) {
            let mut weekdays = [false; 7];
            weekdays[bit] = true;
            let cal = Calendar {
                weekdays,
                start: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2099, 12, 31).unwrap(),
            };
            let expected = d.weekday().num_days_from_monday() as usize == bit;
            prop_assert_eq!(cal.is_active_on(d), expected);
        }
    }
}
