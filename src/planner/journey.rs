//! Journey reconstruction.
//!
//! The scan leaves predecessor chains behind; this module walks them back
//! to the origin, coalesces consecutive hops ridden on the same trip into
//! single segments, resolves ids to display names, and drops journeys that
//! are indistinguishable from a better-ranked one.

use std::collections::HashSet;

use crate::domain::{GtfsTime, Journey, RouteSegment, StopIdx, TripIdx};
use crate::feed::FeedStore;

use super::search::SearchOutcome;

/// A ride over one or more consecutive hops of a single trip.
struct Ride {
    trip: TripIdx,
    board: StopIdx,
    departure: GtfsTime,
    alight: StopIdx,
    arrival: GtfsTime,
}

/// Builds up to `max_results` distinct journeys from ranked labels.
pub(crate) fn build_journeys(
    feed: &FeedStore,
    outcome: &SearchOutcome,
    max_results: usize,
) -> Vec<Journey> {
    let mut journeys = Vec::new();
    let mut seen = HashSet::new();

    for &idx in &outcome.ranked {
        if journeys.len() >= max_results {
            break;
        }
        let Some(journey) = reconstruct(feed, outcome, idx) else {
            continue;
        };
        if seen.insert(signature(&journey)) {
            journeys.push(journey);
        }
    }
    journeys
}

/// Walks one label's predecessor chain into a journey.
///
/// Returns `None` for chains that carry no ride (an origin label) or that
/// fail journey validation; a malformed chain is a result to skip, not a
/// reason to fail the query.
fn reconstruct(
    feed: &FeedStore,
    outcome: &SearchOutcome,
    idx: super::search::LabelIdx,
) -> Option<Journey> {
    // Destination-to-origin edge walk. Predecessor links always point at
    // earlier arena entries, so the walk terminates without a visited set.
    let mut rides_rev: Vec<Ride> = Vec::new();
    let mut cursor = idx;
    loop {
        let label = outcome.label(cursor);
        let Some(pred) = label.pred else { break };
        rides_rev.push(Ride {
            trip: label.trip?,
            board: label.board_stop?,
            departure: label.departure?,
            alight: label.stop,
            arrival: label.arrival,
        });
        cursor = pred;
    }
    if rides_rev.is_empty() {
        return None;
    }
    rides_rev.reverse();

    // Coalesce consecutive hops of the same trip into one ride.
    let mut rides: Vec<Ride> = Vec::new();
    for hop in rides_rev {
        match rides.last_mut() {
            Some(ride)
                if ride.trip == hop.trip
                    && ride.alight == hop.board
                    && ride.arrival <= hop.departure =>
            {
                ride.alight = hop.alight;
                ride.arrival = hop.arrival;
            }
            _ => rides.push(hop),
        }
    }

    let mut segments = Vec::with_capacity(rides.len());
    let mut previous_arrival: Option<GtfsTime> = None;
    for ride in rides {
        let wait = previous_arrival
            .map(|arrival| ride.departure.saturating_since(arrival))
            .unwrap_or(0);
        segments.push(RouteSegment {
            trip_id: feed.trip_id(ride.trip).to_string(),
            route_name: feed.trip_route(ride.trip).name.clone(),
            board_stop_id: feed.stop_id(ride.board).to_string(),
            board_stop_name: feed.stop_name(ride.board).to_string(),
            alight_stop_id: feed.stop_id(ride.alight).to_string(),
            alight_stop_name: feed.stop_name(ride.alight).to_string(),
            board_time: ride.departure,
            alight_time: ride.arrival,
            wait_before_secs: wait,
        });
        previous_arrival = Some(ride.arrival);
    }

    Journey::new(segments).ok()
}

/// Identity of a journey for duplicate removal: the ordered trips, the
/// boarding and alighting stops, and the first departure.
fn signature(journey: &Journey) -> (Vec<String>, Vec<String>, Vec<String>, GtfsTime) {
    let segments = journey.segments();
    (
        segments.iter().map(|s| s.trip_id.clone()).collect(),
        segments.iter().map(|s| s.board_stop_id.clone()).collect(),
        segments.iter().map(|s| s.alight_stop_id.clone()).collect(),
        journey.departure_time(),
    )
}
