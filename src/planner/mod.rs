//! Journey planning.
//!
//! The planner answers one query at a time: resolve the endpoint names,
//! compute the services active on the requested date, build that day's
//! connection list, scan it for the K earliest arrivals, and walk the
//! resulting label chains into printable journeys.

mod config;
mod connections;
mod journey;
mod search;

pub use config::PlannerConfig;
pub use connections::{Connection, build_connections};
pub use search::{CancelFlag, Cancelled};

use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};

use crate::domain::{GtfsTime, Journey, StopIdx, parse_service_date};
use crate::feed::{FeedStore, ResolveError, ResolvedStation};

/// Failure kinds for a single query.
///
/// An empty journey list is *not* among them: routing impossibility is a
/// valid answer, not an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// The date did not parse
    #[error("invalid date {0:?} (expected YYYY-MM-DD or YYYYMMDD)")]
    BadDate(String),

    /// The departure time did not parse
    #[error("invalid time {0:?} (expected HH:MM)")]
    BadTime(String),

    /// No stop name matched the query
    #[error("no station matches {0:?}")]
    StationNotFound(String),

    /// More than one station matched; the caller must disambiguate
    #[error("station name {query:?} is ambiguous ({} candidates)", candidates.len())]
    AmbiguousStation {
        /// The query as entered
        query: String,
        /// Display names of all matching stations
        candidates: Vec<String>,
    },

    /// The search was aborted through its cancel flag
    #[error("query cancelled")]
    Cancelled,
}

/// The journey planner over a loaded feed.
///
/// Holds only borrowed, immutable feed data plus configuration; concurrent
/// queries each construct their own planner (or share one, since nothing
/// here is mutable beyond the cancel flag).
pub struct Planner<'a> {
    feed: &'a FeedStore,
    config: PlannerConfig,
    cancel: CancelFlag,
}

impl<'a> Planner<'a> {
    /// Creates a planner over a feed.
    pub fn new(feed: &'a FeedStore, config: PlannerConfig) -> Self {
        Self {
            feed,
            config,
            cancel: CancelFlag::new(),
        }
    }

    /// Returns a handle that cancels searches run by this planner.
    ///
    /// Callers implement timeouts by setting the flag from a timer.
    pub fn cancel_handle(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Full query surface: station names plus textual date and time.
    ///
    /// `date` accepts `YYYY-MM-DD` or `YYYYMMDD`; `time` accepts `HH:MM`
    /// (hours past 23 address post-midnight service). Returns at most
    /// `max_results` journeys ordered by arrival; an empty list means no
    /// journey was found.
    ///
    /// # Errors
    ///
    /// [`QueryError::BadDate`], [`QueryError::BadTime`],
    /// [`QueryError::StationNotFound`], [`QueryError::AmbiguousStation`]
    /// or [`QueryError::Cancelled`].
    pub fn find_route(
        &self,
        start: &str,
        end: &str,
        date: &str,
        time: &str,
    ) -> Result<Vec<Journey>, QueryError> {
        let date = parse_service_date(date).map_err(|_| QueryError::BadDate(date.to_string()))?;
        let departure =
            GtfsTime::parse_clock(time).map_err(|_| QueryError::BadTime(time.to_string()))?;
        let origin = self.resolve_unique(start)?;
        let destination = self.resolve_unique(end)?;
        self.plan(&origin, &destination, date, departure)
    }

    /// Resolves a station name, requiring it to be unambiguous.
    ///
    /// # Errors
    ///
    /// [`QueryError::StationNotFound`] when nothing matches;
    /// [`QueryError::AmbiguousStation`] listing every candidate when more
    /// than one station does.
    pub fn resolve_unique(&self, query: &str) -> Result<ResolvedStation, QueryError> {
        let mut candidates = self
            .feed
            .resolve_station(query)
            .map_err(|ResolveError::NotFound(name)| QueryError::StationNotFound(name))?;
        if candidates.len() > 1 {
            return Err(QueryError::AmbiguousStation {
                query: query.to_string(),
                candidates: candidates.into_iter().map(|c| c.name).collect(),
            });
        }
        // resolve_station never returns Ok with no candidates.
        Ok(candidates.remove(0))
    }

    /// Plans between two already-resolved stations.
    #[instrument(skip_all, fields(
        origin = %origin.name,
        destination = %destination.name,
        %date,
        departure = %departure,
    ))]
    pub fn plan(
        &self,
        origin: &ResolvedStation,
        destination: &ResolvedStation,
        date: NaiveDate,
        departure: GtfsTime,
    ) -> Result<Vec<Journey>, QueryError> {
        if origin.station == destination.station {
            debug!("origin and destination are the same station");
            return Ok(Vec::new());
        }

        let active = self.feed.active_services(date);
        if active.is_empty() {
            warn!("no active services; the date may lie outside the feed's validity range");
            return Ok(Vec::new());
        }

        let connections = build_connections(self.feed, &active, departure);
        debug!(
            active_services = active.len(),
            connections = connections.len(),
            "connections built"
        );

        let destinations: HashSet<StopIdx> = destination.stops.iter().copied().collect();
        let outcome = search::scan(
            self.feed,
            &connections,
            &origin.stops,
            &destinations,
            departure,
            &self.config,
            &self.cancel,
        )
        .map_err(|search::Cancelled| QueryError::Cancelled)?;

        let journeys = journey::build_journeys(self.feed, &outcome, self.config.max_results);
        info!(journeys = journeys.len(), "query complete");
        Ok(journeys)
    }
}
