//! The feed store: normalised GTFS tables and lookups.
//!
//! Built once at startup and immutable afterwards; it has no interior
//! mutability, so a loaded store can be shared read-only across concurrent
//! queries. All cross-table references are resolved to compact indices at
//! build time, and per-query state (connections, search labels) lives
//! entirely outside the store.

mod error;
mod load;
mod resolve;

pub use error::{LoadError, ResolveError};
pub use load::{
    CalendarDateRow, CalendarRow, FeedTables, RouteRow, StopRow, StopTimeRow, TripRow,
};
pub use resolve::ResolvedStation;

use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::domain::{
    Calendar, ExceptionType, LocationKind, Route, RouteIdx, ServiceIdx, Stop, StopIdx, StopTime,
    Trip, TripIdx,
};

/// The normalised GTFS timetable.
#[derive(Debug)]
pub struct FeedStore {
    stops: Vec<Stop>,
    /// Normalised stop names, parallel to `stops`.
    normalized_names: Vec<String>,
    stop_lookup: HashMap<String, StopIdx>,
    /// Station -> boardable platforms.
    children: HashMap<StopIdx, Vec<StopIdx>>,
    routes: Vec<Route>,
    route_lookup: HashMap<String, RouteIdx>,
    trips: Vec<Trip>,
    trip_lookup: HashMap<String, TripIdx>,
    /// Per-trip calls, sorted by stop_sequence; parallel to `trips`.
    stop_times: Vec<Vec<StopTime>>,
    services: Vec<String>,
    service_lookup: HashMap<String, ServiceIdx>,
    /// Regular schedules, parallel to `services`; `None` for services known
    /// only through exceptions.
    calendars: Vec<Option<Calendar>>,
    exceptions: HashMap<NaiveDate, Vec<(ServiceIdx, ExceptionType)>>,
}

impl FeedStore {
    /// Loads a feed from a directory of GTFS files.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::MissingFile`] or [`LoadError::BadFormat`] with
    /// the offending file and 1-based line number.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, LoadError> {
        let tables = FeedTables::read(dir)?;
        let store = Self::build(tables);
        info!(
            stops = store.stops.len(),
            trips = store.trips.len(),
            routes = store.routes.len(),
            services = store.services.len(),
            "feed loaded"
        );
        Ok(store)
    }

    /// Builds a store from already-parsed tables.
    ///
    /// Cross-references that cannot be resolved (a stop_time naming an
    /// unknown trip or stop, a duplicate id) are dropped with a log line
    /// rather than failing the whole feed; real-world feeds are rarely
    /// perfectly consistent.
    pub fn build(tables: FeedTables) -> Self {
        let mut store = FeedStore {
            stops: Vec::with_capacity(tables.stops.len()),
            normalized_names: Vec::with_capacity(tables.stops.len()),
            stop_lookup: HashMap::with_capacity(tables.stops.len()),
            children: HashMap::new(),
            routes: Vec::with_capacity(tables.routes.len()),
            route_lookup: HashMap::with_capacity(tables.routes.len()),
            trips: Vec::with_capacity(tables.trips.len()),
            trip_lookup: HashMap::with_capacity(tables.trips.len()),
            stop_times: Vec::new(),
            services: Vec::new(),
            service_lookup: HashMap::new(),
            calendars: Vec::new(),
            exceptions: HashMap::new(),
        };

        store.intern_services(&tables);
        store.intern_stops(tables.stops);
        store.intern_routes(tables.routes);
        store.apply_calendar(tables.calendar);
        store.apply_calendar_dates(tables.calendar_dates);
        store.intern_trips(tables.trips);
        store.group_stop_times(tables.stop_times);
        store
    }

    fn intern_stops(&mut self, rows: Vec<StopRow>) {
        // First pass interns every stop; parents resolve in a second pass
        // because a platform may precede its station in the file.
        let mut parents: Vec<Option<String>> = Vec::with_capacity(rows.len());
        for row in rows {
            if self.stop_lookup.contains_key(&row.stop_id) {
                warn!(stop_id = %row.stop_id, "duplicate stop id, keeping first");
                continue;
            }
            let idx = StopIdx::from(self.stops.len());
            self.stop_lookup.insert(row.stop_id.clone(), idx);
            self.normalized_names.push(resolve::normalize_name(&row.stop_name));
            self.stops.push(Stop {
                id: row.stop_id,
                name: row.stop_name,
                parent: None,
                location: LocationKind::from_gtfs(row.location_type.as_deref()),
            });
            parents.push(row.parent_station);
        }

        for (i, parent_id) in parents.into_iter().enumerate() {
            let Some(parent_id) = parent_id else { continue };
            match self.stop_lookup.get(&parent_id) {
                Some(&parent) => {
                    self.stops[i].parent = Some(parent);
                    if self.stops[i].location.is_boardable() {
                        self.children.entry(parent).or_default().push(StopIdx::from(i));
                    }
                }
                None => debug!(
                    stop_id = %self.stops[i].id,
                    parent_station = %parent_id,
                    "parent_station references an unknown stop"
                ),
            }
        }
    }

    fn intern_routes(&mut self, rows: Vec<RouteRow>) {
        for row in rows {
            if self.route_lookup.contains_key(&row.route_id) {
                warn!(route_id = %row.route_id, "duplicate route id, keeping first");
                continue;
            }
            let name = row.short_name.or(row.long_name).unwrap_or_default();
            self.route_lookup
                .insert(row.route_id.clone(), RouteIdx::from(self.routes.len()));
            self.routes.push(Route {
                id: row.route_id,
                name,
            });
        }
    }

    fn intern_services(&mut self, tables: &FeedTables) {
        let ids = tables
            .calendar
            .iter()
            .map(|r| r.service_id.as_str())
            .chain(tables.calendar_dates.iter().map(|r| r.service_id.as_str()))
            .chain(tables.trips.iter().map(|r| r.service_id.as_str()));
        for id in ids {
            if !self.service_lookup.contains_key(id) {
                let idx = ServiceIdx::from(self.services.len());
                self.service_lookup.insert(id.to_string(), idx);
                self.services.push(id.to_string());
            }
        }
        self.calendars = vec![None; self.services.len()];
    }

    fn apply_calendar(&mut self, rows: Vec<CalendarRow>) {
        for row in rows {
            // Interned by intern_services.
            let idx = self.service_lookup[&row.service_id];
            let slot = &mut self.calendars[idx.index()];
            if slot.is_some() {
                warn!(service_id = %row.service_id, "duplicate calendar row, keeping first");
                continue;
            }
            *slot = Some(Calendar {
                weekdays: row.weekdays,
                start: row.start,
                end: row.end,
            });
        }
    }

    fn apply_calendar_dates(&mut self, rows: Vec<CalendarDateRow>) {
        for row in rows {
            let idx = self.service_lookup[&row.service_id];
            self.exceptions
                .entry(row.date)
                .or_default()
                .push((idx, row.exception));
        }
    }

    fn intern_trips(&mut self, rows: Vec<TripRow>) {
        for row in rows {
            if self.trip_lookup.contains_key(&row.trip_id) {
                warn!(trip_id = %row.trip_id, "duplicate trip id, keeping first");
                continue;
            }
            let route = match self.route_lookup.get(&row.route_id) {
                Some(&route) => route,
                None => {
                    // A trip on an undeclared route still runs; give it a
                    // nameless placeholder so journeys can reference it.
                    debug!(trip_id = %row.trip_id, route_id = %row.route_id, "trip references an unknown route");
                    let route = RouteIdx::from(self.routes.len());
                    self.route_lookup.insert(row.route_id.clone(), route);
                    self.routes.push(Route {
                        id: row.route_id,
                        name: String::new(),
                    });
                    route
                }
            };
            let service = self.service_lookup[&row.service_id];
            let idx = TripIdx::from(self.trips.len());
            self.trip_lookup.insert(row.trip_id.clone(), idx);
            self.trips.push(Trip {
                id: row.trip_id,
                route,
                service,
            });
        }
    }

    fn group_stop_times(&mut self, rows: Vec<StopTimeRow>) {
        self.stop_times = vec![Vec::new(); self.trips.len()];
        let mut dropped = 0usize;
        for row in rows {
            let Some(&trip) = self.trip_lookup.get(&row.trip_id) else {
                dropped += 1;
                continue;
            };
            let Some(&stop) = self.stop_lookup.get(&row.stop_id) else {
                dropped += 1;
                continue;
            };
            // A call without both times can be neither boarded nor alighted.
            let (Some(arrival), Some(departure)) = (row.arrival, row.departure) else {
                dropped += 1;
                continue;
            };
            self.stop_times[trip.index()].push(StopTime {
                sequence: row.stop_sequence,
                stop,
                arrival,
                departure,
            });
        }
        if dropped > 0 {
            debug!(dropped, "dropped unusable stop_time rows");
        }
        for calls in &mut self.stop_times {
            calls.sort_by_key(|call| call.sequence);
        }
    }

    /// Set of services active on a date, per calendar and exceptions.
    pub fn active_services(&self, date: NaiveDate) -> HashSet<ServiceIdx> {
        let mut active: HashSet<ServiceIdx> = self
            .calendars
            .iter()
            .enumerate()
            .filter(|(_, cal)| cal.as_ref().is_some_and(|c| c.is_active_on(date)))
            .map(|(i, _)| ServiceIdx::from(i))
            .collect();

        if let Some(exceptions) = self.exceptions.get(&date) {
            for &(service, exception) in exceptions {
                match exception {
                    ExceptionType::Added => {
                        active.insert(service);
                    }
                    ExceptionType::Removed => {
                        active.remove(&service);
                    }
                }
            }
        }
        active
    }

    /// Returns a stop by index.
    pub fn stop(&self, idx: StopIdx) -> &Stop {
        &self.stops[idx.index()]
    }

    /// Returns a stop's GTFS id.
    pub fn stop_id(&self, idx: StopIdx) -> &str {
        &self.stops[idx.index()].id
    }

    /// Returns a stop's display name.
    pub fn stop_name(&self, idx: StopIdx) -> &str {
        &self.stops[idx.index()].name
    }

    /// Looks up a stop by GTFS id.
    pub fn lookup_stop(&self, id: &str) -> Option<StopIdx> {
        self.stop_lookup.get(id).copied()
    }

    /// Returns a trip by index.
    pub fn trip(&self, idx: TripIdx) -> &Trip {
        &self.trips[idx.index()]
    }

    /// Returns a trip's GTFS id.
    pub fn trip_id(&self, idx: TripIdx) -> &str {
        &self.trips[idx.index()].id
    }

    /// Looks up a trip by GTFS id.
    pub fn lookup_trip(&self, id: &str) -> Option<TripIdx> {
        self.trip_lookup.get(id).copied()
    }

    /// Returns the route a trip runs on.
    pub fn trip_route(&self, trip: TripIdx) -> &Route {
        &self.routes[self.trips[trip.index()].route.index()]
    }

    /// Returns a route by index.
    pub fn route(&self, idx: RouteIdx) -> &Route {
        &self.routes[idx.index()]
    }

    /// Returns a service's GTFS id.
    pub fn service_id(&self, idx: ServiceIdx) -> &str {
        &self.services[idx.index()]
    }

    /// Looks up a service by GTFS id.
    pub fn lookup_service(&self, id: &str) -> Option<ServiceIdx> {
        self.service_lookup.get(id).copied()
    }

    /// A trip's calls, sorted by stop_sequence.
    pub fn stop_times(&self, trip: TripIdx) -> &[StopTime] {
        &self.stop_times[trip.index()]
    }

    /// Iterates all trips with their indices.
    pub fn trips(&self) -> impl Iterator<Item = (TripIdx, &Trip)> {
        self.trips.iter().enumerate().map(|(i, t)| (TripIdx::from(i), t))
    }

    /// Number of stops in the feed.
    pub fn stop_count(&self) -> usize {
        self.stops.len()
    }

    /// Number of trips in the feed.
    pub fn trip_count(&self) -> usize {
        self.trips.len()
    }
}
