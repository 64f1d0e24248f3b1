//! Journey output types.
//!
//! A `Journey` is a complete trip from origin to destination: one or more
//! `RouteSegment` rides separated by transfer waits. These are the values
//! handed to the formatter; all ids and names are denormalised so a journey
//! is self-contained.

use super::GtfsTime;

/// Domain-level errors for validation and data consistency.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DomainError {
    /// Journey has no segments
    #[error("journey must have at least one segment")]
    EmptyJourney,

    /// A segment alights before it boards
    #[error("segment on trip {trip_id} alights at {alight} before boarding at {board}")]
    SegmentTimesReversed {
        trip_id: String,
        board: GtfsTime,
        alight: GtfsTime,
    },

    /// Consecutive segments overlap in time
    #[error("segment boards at {board} before the previous segment alights at {prev_alight}")]
    SegmentsOutOfOrder {
        prev_alight: GtfsTime,
        board: GtfsTime,
    },
}

/// One ride on a single trip, from boarding stop to alighting stop.
///
/// Consecutive hops of the same trip are coalesced into one segment before
/// a journey is built, so a three-segment journey means two transfers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSegment {
    /// Trip this ride is on.
    pub trip_id: String,
    /// Route display name (e.g. "IC 3"); may be empty if the feed has none.
    pub route_name: String,
    /// Boarding stop id.
    pub board_stop_id: String,
    /// Boarding stop display name.
    pub board_stop_name: String,
    /// Alighting stop id.
    pub alight_stop_id: String,
    /// Alighting stop display name.
    pub alight_stop_name: String,
    /// Departure time at the boarding stop.
    pub board_time: GtfsTime,
    /// Arrival time at the alighting stop.
    pub alight_time: GtfsTime,
    /// Wait at the boarding stop since the previous segment's arrival;
    /// 0 for the first segment.
    pub wait_before_secs: u32,
}

impl RouteSegment {
    /// Ride duration in seconds.
    pub fn duration_secs(&self) -> u32 {
        self.alight_time.saturating_since(self.board_time)
    }
}

/// A complete journey from origin to destination.
///
/// # Invariants
///
/// - At least one segment
/// - Within every segment, boarding is no later than alighting
/// - Consecutive segments do not overlap in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Journey {
    segments: Vec<RouteSegment>,
}

impl Journey {
    /// Constructs a journey, validating the segment sequence.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the segment list is empty, a segment's times are
    /// reversed, or a segment boards before its predecessor alights.
    pub fn new(segments: Vec<RouteSegment>) -> Result<Self, DomainError> {
        if segments.is_empty() {
            return Err(DomainError::EmptyJourney);
        }

        for segment in &segments {
            if segment.alight_time < segment.board_time {
                return Err(DomainError::SegmentTimesReversed {
                    trip_id: segment.trip_id.clone(),
                    board: segment.board_time,
                    alight: segment.alight_time,
                });
            }
        }

        for window in segments.windows(2) {
            if window[1].board_time < window[0].alight_time {
                return Err(DomainError::SegmentsOutOfOrder {
                    prev_alight: window[0].alight_time,
                    board: window[1].board_time,
                });
            }
        }

        Ok(Journey { segments })
    }

    /// Returns all segments in order.
    pub fn segments(&self) -> &[RouteSegment] {
        &self.segments
    }

    /// Returns the first segment.
    pub fn first(&self) -> &RouteSegment {
        // Safe: validated non-empty at construction
        self.segments.first().unwrap()
    }

    /// Returns the last segment.
    pub fn last(&self) -> &RouteSegment {
        // Safe: validated non-empty at construction
        self.segments.last().unwrap()
    }

    /// Departure time at the origin stop.
    pub fn departure_time(&self) -> GtfsTime {
        self.first().board_time
    }

    /// Arrival time at the destination stop.
    pub fn arrival_time(&self) -> GtfsTime {
        self.last().alight_time
    }

    /// Total travel time in seconds, boarding to final arrival.
    pub fn duration_secs(&self) -> u32 {
        self.arrival_time().saturating_since(self.departure_time())
    }

    /// Number of transfers (segments minus one).
    pub fn transfer_count(&self) -> usize {
        self.segments.len() - 1
    }

    /// Returns true for a single-ride journey.
    pub fn is_direct(&self) -> bool {
        self.segments.len() == 1
    }
}
