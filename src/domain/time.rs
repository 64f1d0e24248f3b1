//! GTFS time handling.
//!
//! GTFS encodes stop times as "HH:MM:SS" strings measured from midnight of
//! the service day, where the hour field may exceed 23 to place a stop after
//! midnight on the *same* service day (a trip departing at `25:10:00` runs
//! at 01:10 the next calendar morning). This module keeps such times as
//! plain seconds so that ordering within one service day stays natural.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

/// Error returned when parsing an invalid time string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time: {reason}")]
pub struct TimeError {
    reason: &'static str,
}

impl TimeError {
    fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// Error returned when parsing an invalid service date string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid date: expected YYYY-MM-DD or YYYYMMDD")]
pub struct DateError;

/// A time of a service day, in seconds since midnight.
///
/// Unlike a wall-clock time this may exceed 24 hours: GTFS models
/// post-midnight service by letting the hour run past 23, and the planner
/// relies on that to keep all times of one service day totally ordered.
///
/// # Examples
///
/// ```
/// use routech::domain::GtfsTime;
///
/// let morning = GtfsTime::parse("08:00:00").unwrap();
/// assert_eq!(morning.seconds(), 28_800);
///
/// // Post-midnight times keep their raw value.
/// let late = GtfsTime::parse("25:10:00").unwrap();
/// assert_eq!(late.seconds(), 90_600);
/// assert!(late > morning);
/// assert_eq!(late.to_string(), "25:10");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GtfsTime(u32);

impl GtfsTime {
    /// Creates a time from raw seconds since midnight of the service day.
    pub const fn from_seconds(seconds: u32) -> Self {
        Self(seconds)
    }

    /// Returns the raw seconds since midnight of the service day.
    pub const fn seconds(self) -> u32 {
        self.0
    }

    /// Parse a GTFS "HH:MM:SS" time.
    ///
    /// The hour may exceed 23 (post-midnight service). A missing seconds
    /// field is tolerated, since some feeds emit "HH:MM".
    ///
    /// # Errors
    ///
    /// Returns `Err` for empty fields, non-digit fields, or minute/second
    /// values of 60 or more.
    pub fn parse(s: &str) -> Result<Self, TimeError> {
        let mut parts = s.split(':');

        let hours = parse_field(parts.next(), "missing hour field")?;
        let minutes = parse_field(parts.next(), "missing minute field")?;
        let seconds = match parts.next() {
            Some(field) => parse_field(Some(field), "empty second field")?,
            None => 0,
        };
        if parts.next().is_some() {
            return Err(TimeError::new("too many ':'-separated fields"));
        }

        if hours > 168 {
            return Err(TimeError::new("hour out of range"));
        }
        if minutes > 59 {
            return Err(TimeError::new("minute must be 0-59"));
        }
        if seconds > 59 {
            return Err(TimeError::new("second must be 0-59"));
        }

        Ok(Self(hours * 3600 + minutes * 60 + seconds))
    }

    /// Parse a user-supplied "HH:MM" clock time.
    ///
    /// The hour may exceed 23 so that a query for post-midnight service
    /// ("24:30") addresses the tail of the *previous* service day.
    pub fn parse_clock(s: &str) -> Result<Self, TimeError> {
        let (h, m) = s
            .split_once(':')
            .ok_or_else(|| TimeError::new("expected HH:MM format"))?;

        let hours = parse_field(Some(h), "missing hour field")?;
        let minutes = parse_field(Some(m), "missing minute field")?;

        if hours > 168 {
            return Err(TimeError::new("hour out of range"));
        }
        if minutes > 59 {
            return Err(TimeError::new("minute must be 0-59"));
        }

        Ok(Self(hours * 3600 + minutes * 60))
    }

    /// Returns the hour component; may be 24 or more for post-midnight times.
    pub const fn hour(self) -> u32 {
        self.0 / 3600
    }

    /// Returns the minute component (0-59).
    pub const fn minute(self) -> u32 {
        (self.0 % 3600) / 60
    }

    /// Seconds elapsed since `earlier`, or 0 if `earlier` is later.
    pub const fn saturating_since(self, earlier: Self) -> u32 {
        self.0.saturating_sub(earlier.0)
    }
}

impl FromStr for GtfsTime {
    type Err = TimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for GtfsTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GtfsTime({:02}:{:02}:{:02})", self.hour(), self.minute(), self.0 % 60)
    }
}

impl fmt::Display for GtfsTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Hours beyond 23 are rendered as-is ("25:10"); folding them back
        // into wall-clock time would mislabel the service day.
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

fn parse_field(field: Option<&str>, missing: &'static str) -> Result<u32, TimeError> {
    let field = field.ok_or_else(|| TimeError::new(missing))?;
    if field.is_empty() {
        return Err(TimeError::new(missing));
    }
    if !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TimeError::new("non-digit characters in field"));
    }
    if field.len() > 3 {
        return Err(TimeError::new("field too long"));
    }
    field
        .parse::<u32>()
        .map_err(|_| TimeError::new("unparsable field"))
}

/// Parse a service date in either `YYYY-MM-DD` or bare `YYYYMMDD` form.
///
/// # Examples
///
/// ```
/// use routech::domain::parse_service_date;
/// use chrono::NaiveDate;
///
/// let expected = NaiveDate::from_ymd_opt(2025, 12, 15).unwrap();
/// assert_eq!(parse_service_date("2025-12-15").unwrap(), expected);
/// assert_eq!(parse_service_date("20251215").unwrap(), expected);
/// assert!(parse_service_date("15.12.2025").is_err());
/// ```
pub fn parse_service_date(s: &str) -> Result<NaiveDate, DateError> {
    let s = s.trim();
    let format = if s.len() == 8 && !s.contains('-') {
        "%Y%m%d"
    } else {
        "%Y-%m-%d"
    };
    NaiveDate::parse_from_str(s, format).map_err(|_| DateError)
}
