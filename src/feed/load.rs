//! CSV ingestion for the mandatory GTFS tables.
//!
//! Each table is read row by row so that every parse failure can report the
//! physical line it occurred on (the header is line 1). Rows are mapped by
//! header name; unknown columns are ignored and absent optional columns are
//! treated as empty. Following the conventions of real-world feeds, rows
//! whose identifying field is empty are skipped rather than fatal.

use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::warn;

use crate::domain::{ExceptionType, GtfsTime};

use super::error::LoadError;

pub(crate) const STOPS_FILE: &str = "stops.txt";
pub(crate) const STOP_TIMES_FILE: &str = "stop_times.txt";
pub(crate) const TRIPS_FILE: &str = "trips.txt";
pub(crate) const ROUTES_FILE: &str = "routes.txt";
pub(crate) const CALENDAR_FILE: &str = "calendar.txt";
pub(crate) const CALENDAR_DATES_FILE: &str = "calendar_dates.txt";

/// Parsed rows of the six mandatory GTFS tables.
///
/// Produced by [`FeedTables::read`]; tests assemble these directly to build
/// a store without touching the filesystem.
#[derive(Debug, Clone, Default)]
pub struct FeedTables {
    /// Rows of `stops.txt`.
    pub stops: Vec<StopRow>,
    /// Rows of `stop_times.txt`.
    pub stop_times: Vec<StopTimeRow>,
    /// Rows of `trips.txt`.
    pub trips: Vec<TripRow>,
    /// Rows of `routes.txt`.
    pub routes: Vec<RouteRow>,
    /// Rows of `calendar.txt`.
    pub calendar: Vec<CalendarRow>,
    /// Rows of `calendar_dates.txt`.
    pub calendar_dates: Vec<CalendarDateRow>,
}

impl FeedTables {
    /// Reads all six tables from a feed directory.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::MissingFile`] if a table file is absent and
    /// [`LoadError::BadFormat`] with a 1-based line number for malformed
    /// content.
    pub fn read(dir: impl AsRef<Path>) -> Result<Self, LoadError> {
        let dir = dir.as_ref();
        Ok(Self {
            stops: read_stops(dir)?,
            stop_times: read_stop_times(dir)?,
            trips: read_trips(dir)?,
            routes: read_routes(dir)?,
            calendar: read_calendar(dir)?,
            calendar_dates: read_calendar_dates(dir)?,
        })
    }
}

/// A row of `stops.txt`.
#[derive(Debug, Clone)]
pub struct StopRow {
    pub stop_id: String,
    pub stop_name: String,
    pub parent_station: Option<String>,
    pub location_type: Option<String>,
}

/// A row of `stop_times.txt`, times parsed to seconds.
///
/// Timepoint-less rows leave arrival or departure empty in real feeds;
/// those fields come through as `None` and the row is dropped when the
/// store is built, since a call without times cannot be boarded or alighted.
#[derive(Debug, Clone)]
pub struct StopTimeRow {
    pub trip_id: String,
    pub stop_id: String,
    pub stop_sequence: u32,
    pub arrival: Option<GtfsTime>,
    pub departure: Option<GtfsTime>,
}

/// A row of `trips.txt`.
#[derive(Debug, Clone)]
pub struct TripRow {
    pub trip_id: String,
    pub route_id: String,
    pub service_id: String,
}

/// A row of `routes.txt`.
#[derive(Debug, Clone)]
pub struct RouteRow {
    pub route_id: String,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
}

/// A row of `calendar.txt`, dates parsed.
#[derive(Debug, Clone)]
pub struct CalendarRow {
    pub service_id: String,
    /// Active weekdays, Monday first.
    pub weekdays: [bool; 7],
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// A row of `calendar_dates.txt`, date and exception parsed.
#[derive(Debug, Clone)]
pub struct CalendarDateRow {
    pub service_id: String,
    pub date: NaiveDate,
    pub exception: ExceptionType,
}

#[derive(Debug, Deserialize)]
struct RawStop {
    stop_id: String,
    stop_name: String,
    parent_station: Option<String>,
    location_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawStopTime {
    trip_id: String,
    arrival_time: Option<String>,
    departure_time: Option<String>,
    stop_id: String,
    stop_sequence: u32,
}

#[derive(Debug, Deserialize)]
struct RawTrip {
    trip_id: String,
    route_id: String,
    service_id: String,
}

#[derive(Debug, Deserialize)]
struct RawRoute {
    route_id: String,
    route_short_name: Option<String>,
    route_long_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCalendar {
    service_id: String,
    monday: Option<String>,
    tuesday: Option<String>,
    wednesday: Option<String>,
    thursday: Option<String>,
    friday: Option<String>,
    saturday: Option<String>,
    sunday: Option<String>,
    start_date: String,
    end_date: String,
}

#[derive(Debug, Deserialize)]
struct RawCalendarDate {
    service_id: String,
    date: String,
    exception_type: u8,
}

fn open_reader(dir: &Path, file: &'static str) -> Result<csv::Reader<std::fs::File>, LoadError> {
    let path = dir.join(file);
    match csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(&path)
    {
        Ok(reader) => Ok(reader),
        Err(err) => Err(match err.into_kind() {
            csv::ErrorKind::Io(source) if source.kind() == std::io::ErrorKind::NotFound => {
                LoadError::MissingFile { file }
            }
            csv::ErrorKind::Io(source) => LoadError::Io { file, source },
            other => LoadError::BadFormat {
                file,
                line: 0,
                message: format!("{other:?}"),
            },
        }),
    }
}

fn bad_format(file: &'static str, err: &csv::Error) -> LoadError {
    LoadError::BadFormat {
        file,
        line: err.position().map(|p| p.line()).unwrap_or(0),
        message: err.to_string(),
    }
}

/// Drives `read_record` over a table, handing each record and its 1-based
/// line number to `handle`.
fn for_each_record<F>(dir: &Path, file: &'static str, mut handle: F) -> Result<(), LoadError>
where
    F: FnMut(&csv::StringRecord, &csv::StringRecord, u64) -> Result<(), LoadError>,
{
    let mut reader = open_reader(dir, file)?;
    let headers = reader
        .headers()
        .map_err(|e| bad_format(file, &e))?
        .clone();
    let mut record = csv::StringRecord::new();
    while reader
        .read_record(&mut record)
        .map_err(|e| bad_format(file, &e))?
    {
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        handle(&headers, &record, line)?;
    }
    Ok(())
}

fn deserialize_record<'de, T: Deserialize<'de>>(
    headers: &'de csv::StringRecord,
    record: &'de csv::StringRecord,
    file: &'static str,
    line: u64,
) -> Result<T, LoadError> {
    record
        .deserialize(Some(headers))
        .map_err(|e| LoadError::BadFormat {
            file,
            line,
            message: e.to_string(),
        })
}

fn none_if_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

fn parse_opt_time(
    value: Option<String>,
    file: &'static str,
    line: u64,
) -> Result<Option<GtfsTime>, LoadError> {
    match none_if_empty(value) {
        None => Ok(None),
        Some(s) => GtfsTime::parse(&s)
            .map(Some)
            .map_err(|e| LoadError::BadFormat {
                file,
                line,
                message: e.to_string(),
            }),
    }
}

fn weekday_flag(value: &Option<String>) -> bool {
    value.as_deref() == Some("1")
}

fn parse_gtfs_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y%m%d").ok()
}

fn read_stops(dir: &Path) -> Result<Vec<StopRow>, LoadError> {
    let file = STOPS_FILE;
    let mut rows = Vec::new();
    for_each_record(dir, file, |headers, record, line| {
        let raw: RawStop = deserialize_record(headers, record, file, line)?;
        if raw.stop_id.is_empty() {
            return Ok(());
        }
        rows.push(StopRow {
            stop_id: raw.stop_id,
            stop_name: raw.stop_name,
            parent_station: none_if_empty(raw.parent_station),
            location_type: none_if_empty(raw.location_type),
        });
        Ok(())
    })?;
    Ok(rows)
}

fn read_stop_times(dir: &Path) -> Result<Vec<StopTimeRow>, LoadError> {
    let file = STOP_TIMES_FILE;
    let mut rows = Vec::new();
    for_each_record(dir, file, |headers, record, line| {
        let raw: RawStopTime = deserialize_record(headers, record, file, line)?;
        if raw.trip_id.is_empty() || raw.stop_id.is_empty() {
            return Ok(());
        }
        rows.push(StopTimeRow {
            arrival: parse_opt_time(raw.arrival_time, file, line)?,
            departure: parse_opt_time(raw.departure_time, file, line)?,
            trip_id: raw.trip_id,
            stop_id: raw.stop_id,
            stop_sequence: raw.stop_sequence,
        });
        Ok(())
    })?;
    Ok(rows)
}

fn read_trips(dir: &Path) -> Result<Vec<TripRow>, LoadError> {
    let file = TRIPS_FILE;
    let mut rows = Vec::new();
    for_each_record(dir, file, |headers, record, line| {
        let raw: RawTrip = deserialize_record(headers, record, file, line)?;
        if raw.trip_id.is_empty() || raw.service_id.is_empty() {
            return Ok(());
        }
        rows.push(TripRow {
            trip_id: raw.trip_id,
            route_id: raw.route_id,
            service_id: raw.service_id,
        });
        Ok(())
    })?;
    Ok(rows)
}

fn read_routes(dir: &Path) -> Result<Vec<RouteRow>, LoadError> {
    let file = ROUTES_FILE;
    let mut rows = Vec::new();
    for_each_record(dir, file, |headers, record, line| {
        let raw: RawRoute = deserialize_record(headers, record, file, line)?;
        if raw.route_id.is_empty() {
            return Ok(());
        }
        rows.push(RouteRow {
            route_id: raw.route_id,
            short_name: none_if_empty(raw.route_short_name),
            long_name: none_if_empty(raw.route_long_name),
        });
        Ok(())
    })?;
    Ok(rows)
}

fn read_calendar(dir: &Path) -> Result<Vec<CalendarRow>, LoadError> {
    let file = CALENDAR_FILE;
    let mut rows = Vec::new();
    for_each_record(dir, file, |headers, record, line| {
        let raw: RawCalendar = deserialize_record(headers, record, file, line)?;
        if raw.service_id.is_empty() {
            return Ok(());
        }
        let (start, end) = match (parse_gtfs_date(&raw.start_date), parse_gtfs_date(&raw.end_date))
        {
            (Some(start), Some(end)) => (start, end),
            _ => {
                warn!(
                    service_id = %raw.service_id,
                    line,
                    "skipping calendar row with unparsable date range"
                );
                return Ok(());
            }
        };
        rows.push(CalendarRow {
            service_id: raw.service_id,
            weekdays: [
                weekday_flag(&raw.monday),
                weekday_flag(&raw.tuesday),
                weekday_flag(&raw.wednesday),
                weekday_flag(&raw.thursday),
                weekday_flag(&raw.friday),
                weekday_flag(&raw.saturday),
                weekday_flag(&raw.sunday),
            ],
            start,
            end,
        });
        Ok(())
    })?;
    Ok(rows)
}

fn read_calendar_dates(dir: &Path) -> Result<Vec<CalendarDateRow>, LoadError> {
    let file = CALENDAR_DATES_FILE;
    let mut rows = Vec::new();
    for_each_record(dir, file, |headers, record, line| {
        let raw: RawCalendarDate = deserialize_record(headers, record, file, line)?;
        if raw.service_id.is_empty() {
            return Ok(());
        }
        let date = parse_gtfs_date(&raw.date).ok_or_else(|| LoadError::BadFormat {
            file,
            line,
            message: format!("invalid date {:?} (expected YYYYMMDD)", raw.date),
        })?;
        let exception =
            ExceptionType::from_gtfs(raw.exception_type).ok_or_else(|| LoadError::BadFormat {
                file,
                line,
                message: format!("exception_type must be 1 or 2, got {}", raw.exception_type),
            })?;
        rows.push(CalendarDateRow {
            service_id: raw.service_id,
            date,
            exception,
        });
        Ok(())
    })?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Writes a minimal but complete feed, then lets a test overwrite
    /// individual files.
    fn feed_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            STOPS_FILE,
            "stop_id,stop_name,parent_station,location_type\n\
             S1,Basel SBB,,1\n\
             S1:1,Basel SBB,S1,0\n",
        );
        write(
            &dir,
            STOP_TIMES_FILE,
            "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n\
             T1,08:00:00,08:00:00,S1:1,1\n",
        );
        write(&dir, TRIPS_FILE, "trip_id,route_id,service_id\nT1,R1,WK\n");
        write(&dir, ROUTES_FILE, "route_id,route_short_name\nR1,IC 3\n");
        write(
            &dir,
            CALENDAR_FILE,
            "service_id,monday,tuesday,wednesday,thursday,friday,saturday,sunday,start_date,end_date\n\
             WK,1,1,1,1,1,0,0,20251201,20251231\n",
        );
        write(
            &dir,
            CALENDAR_DATES_FILE,
            "service_id,date,exception_type\nWK,20251225,2\n",
        );
        dir
    }

    fn write(dir: &TempDir, file: &str, content: &str) {
        fs::write(dir.path().join(file), content).unwrap();
    }

    #[test]
    fn reads_complete_feed() {
        let dir = feed_dir();
        let tables = FeedTables::read(dir.path()).unwrap();

        assert_eq!(tables.stops.len(), 2);
        assert_eq!(tables.stops[0].stop_id, "S1");
        assert_eq!(tables.stops[1].parent_station.as_deref(), Some("S1"));

        assert_eq!(tables.stop_times.len(), 1);
        assert_eq!(
            tables.stop_times[0].departure,
            Some(GtfsTime::from_seconds(28_800))
        );

        assert_eq!(tables.trips.len(), 1);
        assert_eq!(tables.routes[0].short_name.as_deref(), Some("IC 3"));

        assert_eq!(tables.calendar.len(), 1);
        assert_eq!(
            tables.calendar[0].weekdays,
            [true, true, true, true, true, false, false]
        );

        assert_eq!(tables.calendar_dates.len(), 1);
        assert_eq!(tables.calendar_dates[0].exception, ExceptionType::Removed);
    }

    #[test]
    fn missing_file_is_reported_by_name() {
        let dir = feed_dir();
        fs::remove_file(dir.path().join(TRIPS_FILE)).unwrap();

        let err = FeedTables::read(dir.path()).unwrap_err();
        assert!(matches!(err, LoadError::MissingFile { file: "trips.txt" }));
    }

    #[test]
    fn bad_time_reports_line_number() {
        let dir = feed_dir();
        write(
            &dir,
            STOP_TIMES_FILE,
            "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n\
             T1,08:00:00,08:00:00,S1:1,1\n\
             T1,08:99:00,08:00:00,S1:1,2\n",
        );

        let err = FeedTables::read(dir.path()).unwrap_err();
        match err {
            LoadError::BadFormat { file, line, .. } => {
                assert_eq!(file, "stop_times.txt");
                assert_eq!(line, 3);
            }
            other => panic!("expected BadFormat, got {other:?}"),
        }
    }

    #[test]
    fn bad_stop_sequence_is_bad_format() {
        let dir = feed_dir();
        write(
            &dir,
            STOP_TIMES_FILE,
            "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n\
             T1,08:00:00,08:00:00,S1:1,first\n",
        );

        assert!(matches!(
            FeedTables::read(dir.path()),
            Err(LoadError::BadFormat { .. })
        ));
    }

    #[test]
    fn post_midnight_times_are_preserved() {
        let dir = feed_dir();
        write(
            &dir,
            STOP_TIMES_FILE,
            "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n\
             T1,25:10:00,25:10:00,S1:1,1\n",
        );

        let tables = FeedTables::read(dir.path()).unwrap();
        assert_eq!(
            tables.stop_times[0].arrival,
            Some(GtfsTime::from_seconds(90_600))
        );
    }

    #[test]
    fn empty_times_come_through_as_none() {
        let dir = feed_dir();
        write(
            &dir,
            STOP_TIMES_FILE,
            "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n\
             T1,,,S1:1,1\n",
        );

        let tables = FeedTables::read(dir.path()).unwrap();
        assert_eq!(tables.stop_times[0].arrival, None);
        assert_eq!(tables.stop_times[0].departure, None);
    }

    #[test]
    fn unknown_columns_are_ignored() {
        let dir = feed_dir();
        write(
            &dir,
            ROUTES_FILE,
            "route_id,agency_id,route_short_name,route_color\nR1,SBB,IC 3,FF0000\n",
        );

        let tables = FeedTables::read(dir.path()).unwrap();
        assert_eq!(tables.routes[0].short_name.as_deref(), Some("IC 3"));
    }

    #[test]
    fn rows_with_empty_ids_are_skipped() {
        let dir = feed_dir();
        write(
            &dir,
            TRIPS_FILE,
            "trip_id,route_id,service_id\n,R1,WK\nT2,R1,\nT3,R1,WK\n",
        );

        let tables = FeedTables::read(dir.path()).unwrap();
        assert_eq!(tables.trips.len(), 1);
        assert_eq!(tables.trips[0].trip_id, "T3");
    }

    #[test]
    fn long_name_fallback_survives() {
        let dir = feed_dir();
        write(
            &dir,
            ROUTES_FILE,
            "route_id,route_short_name,route_long_name\nR1,,Basel - Zürich\n",
        );

        let tables = FeedTables::read(dir.path()).unwrap();
        assert_eq!(tables.routes[0].short_name, None);
        assert_eq!(tables.routes[0].long_name.as_deref(), Some("Basel - Zürich"));
    }

    #[test]
    fn unparsable_calendar_range_is_skipped() {
        let dir = feed_dir();
        write(
            &dir,
            CALENDAR_FILE,
            "service_id,monday,tuesday,wednesday,thursday,friday,saturday,sunday,start_date,end_date\n\
             BAD,1,1,1,1,1,1,1,notadate,20251231\n\
             OK,1,1,1,1,1,1,1,20251201,20251231\n",
        );

        let tables = FeedTables::read(dir.path()).unwrap();
        assert_eq!(tables.calendar.len(), 1);
        assert_eq!(tables.calendar[0].service_id, "OK");
    }

    #[test]
    fn invalid_exception_type_is_bad_format() {
        let dir = feed_dir();
        write(
            &dir,
            CALENDAR_DATES_FILE,
            "service_id,date,exception_type\nWK,20251225,7\n",
        );

        let err = FeedTables::read(dir.path()).unwrap_err();
        match err {
            LoadError::BadFormat { file, line, message } => {
                assert_eq!(file, "calendar_dates.txt");
                assert_eq!(line, 2);
                assert!(message.contains("exception_type"));
            }
            other => panic!("expected BadFormat, got {other:?}"),
        }
    }
}
