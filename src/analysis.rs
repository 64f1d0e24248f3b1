//! Supplementary feed analytics.
//!
//! Single sequential passes over the feed tables; nothing here touches the
//! planner. Results are plain value types for the console layer to render.

use std::collections::HashMap;

use crate::domain::GtfsTime;
use crate::feed::FeedStore;

/// Seconds in one calendar day; calls at or past this run after midnight.
const DAY_SECS: u32 = 24 * 3600;

/// How often a stop is called at across the whole feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopFrequency {
    /// Stop display name.
    pub name: String,
    /// Number of stop_time rows referencing the stop.
    pub calls: usize,
}

/// The busiest stops by call count, busiest first.
///
/// Ties are broken by name so the listing is stable across runs.
pub fn busiest_stops(feed: &FeedStore, limit: usize) -> Vec<StopFrequency> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for (trip, _) in feed.trips() {
        for call in feed.stop_times(trip) {
            *counts.entry(feed.stop_name(call.stop)).or_default() += 1;
        }
    }

    let mut ranked: Vec<StopFrequency> = counts
        .into_iter()
        .map(|(name, calls)| StopFrequency {
            name: name.to_string(),
            calls,
        })
        .collect();
    ranked.sort_by(|a, b| b.calls.cmp(&a.calls).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(limit);
    ranked
}

/// A hop that runs past midnight of its service day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OvernightHop {
    /// Trip the hop belongs to.
    pub trip_id: String,
    /// Route display name; may be empty.
    pub route_name: String,
    /// Boarding stop display name.
    pub from_name: String,
    /// Alighting stop display name.
    pub to_name: String,
    /// Departure at the boarding stop.
    pub departure: GtfsTime,
    /// Arrival at the alighting stop.
    pub arrival: GtfsTime,
}

/// Adjacent hops whose arrival lies beyond midnight, in feed order.
pub fn overnight_hops(feed: &FeedStore, limit: usize) -> Vec<OvernightHop> {
    let mut hops = Vec::new();
    for (trip, _) in feed.trips() {
        for pair in feed.stop_times(trip).windows(2) {
            if pair[1].arrival.seconds() < DAY_SECS {
                continue;
            }
            hops.push(OvernightHop {
                trip_id: feed.trip_id(trip).to_string(),
                route_name: feed.trip_route(trip).name.clone(),
                from_name: feed.stop_name(pair[0].stop).to_string(),
                to_name: feed.stop_name(pair[1].stop).to_string(),
                departure: pair[0].departure,
                arrival: pair[1].arrival,
            });
            if hops.len() == limit {
                return hops;
            }
        }
    }
    hops
}

/// The fastest end-to-end trip departing in one hour bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HourlyFastest {
    /// Departure hour since midnight of the service day; may exceed 23.
    pub hour: u32,
    /// First-to-last-call duration in seconds.
    pub duration_secs: u32,
    /// Route display name of the fastest trip.
    pub route_name: String,
}

/// For every departure hour, the minimum first-call-to-last-call duration
/// among all trips, sorted by hour.
pub fn fastest_direct_per_hour(feed: &FeedStore) -> Vec<HourlyFastest> {
    let mut fastest: HashMap<u32, HourlyFastest> = HashMap::new();
    for (trip, _) in feed.trips() {
        let calls = feed.stop_times(trip);
        let (Some(first), Some(last)) = (calls.first(), calls.last()) else {
            continue;
        };
        if calls.len() < 2 {
            continue;
        }
        let duration = last.arrival.saturating_since(first.departure);
        let hour = first.departure.hour();
        let entry = fastest.entry(hour);
        match entry {
            std::collections::hash_map::Entry::Occupied(mut slot) => {
                if duration < slot.get().duration_secs {
                    slot.insert(HourlyFastest {
                        hour,
                        duration_secs: duration,
                        route_name: feed.trip_route(trip).name.clone(),
                    });
                }
            }
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(HourlyFastest {
                    hour,
                    duration_secs: duration,
                    route_name: feed.trip_route(trip).name.clone(),
                });
            }
        }
    }

    let mut ranked: Vec<HourlyFastest> = fastest.into_values().collect();
    ranked.sort_by_key(|h| h.hour);
    ranked
}
