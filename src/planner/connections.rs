//! Connection building.
//!
//! A connection is one directed hop between two consecutive calls of a
//! single trip at fixed times. The search consumes the day's connections as
//! a flat list sorted by departure; building that list is a single pass
//! over the active trips' calls: adjacent pairs only, never a self-join of
//! all stop pairs within a trip.

use std::collections::HashSet;

use tracing::debug;

use crate::domain::{GtfsTime, RouteIdx, ServiceIdx, StopIdx, TripIdx};
use crate::feed::FeedStore;

/// One rideable hop of a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    /// Trip the hop belongs to.
    pub trip: TripIdx,
    /// The trip's route, denormalised for journey rendering.
    pub route: RouteIdx,
    /// Boarding stop.
    pub from: StopIdx,
    /// Alighting stop.
    pub to: StopIdx,
    /// Departure at the boarding stop.
    pub departure: GtfsTime,
    /// Arrival at the alighting stop; never earlier than `departure`.
    pub arrival: GtfsTime,
}

/// Builds the sorted connection list for one service day.
///
/// Emits a connection for every adjacent call pair of every trip whose
/// service is in `active`, dropping connections departing before
/// `earliest`. Post-midnight times keep their raw >24h values, so ordering
/// within the service day is natural. The result is sorted by departure,
/// then arrival, then trip id, which makes the downstream scan
/// deterministic.
pub fn build_connections(
    feed: &FeedStore,
    active: &HashSet<ServiceIdx>,
    earliest: GtfsTime,
) -> Vec<Connection> {
    let mut connections = Vec::new();
    let mut malformed = 0usize;

    for (trip_idx, trip) in feed.trips() {
        if !active.contains(&trip.service) {
            continue;
        }
        let calls = feed.stop_times(trip_idx);
        for pair in calls.windows(2) {
            let departure = pair[0].departure;
            let arrival = pair[1].arrival;
            if departure < earliest {
                continue;
            }
            if arrival < departure {
                // Inconsistent feed row; an unrideable hop.
                malformed += 1;
                continue;
            }
            connections.push(Connection {
                trip: trip_idx,
                route: trip.route,
                from: pair[0].stop,
                to: pair[1].stop,
                departure,
                arrival,
            });
        }
    }

    if malformed > 0 {
        debug!(malformed, "dropped hops arriving before they depart");
    }

    connections.sort_by(|a, b| {
        a.departure
            .cmp(&b.departure)
            .then_with(|| a.arrival.cmp(&b.arrival))
            .then_with(|| feed.trip_id(a.trip).cmp(feed.trip_id(b.trip)))
    });
    connections
}
