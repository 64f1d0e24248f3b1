//! Trip, route and stop-time table rows.

use super::{GtfsTime, RouteIdx, ServiceIdx, StopIdx};

/// A route, carrying the display name journeys are labelled with.
#[derive(Debug, Clone)]
pub struct Route {
    /// Opaque GTFS route id.
    pub id: String,
    /// Short name (e.g. "IC 3"), falling back to the long name; may be
    /// empty if the feed provides neither.
    pub name: String,
}

/// One scheduled run of a vehicle along a route.
#[derive(Debug, Clone)]
pub struct Trip {
    /// Opaque GTFS trip id.
    pub id: String,
    /// Route this trip belongs to.
    pub route: RouteIdx,
    /// Calendar service governing the dates this trip runs.
    pub service: ServiceIdx,
}

/// A scheduled call of a trip at a stop.
///
/// Within a trip, rows are kept sorted by `sequence`; arrival and departure
/// are seconds since midnight of the service day and may exceed 86 400 for
/// post-midnight calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopTime {
    /// Ordering key within the trip.
    pub sequence: u32,
    /// The stop called at.
    pub stop: StopIdx,
    /// Arrival time at the stop.
    pub arrival: GtfsTime,
    /// Departure time from the stop; never earlier than `arrival`.
    pub departure: GtfsTime,
}
