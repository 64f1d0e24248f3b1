//! Stop and station types.

use super::StopIdx;

/// Role of a stop record in the station hierarchy.
///
/// GTFS distinguishes boarding platforms (`location_type` 0 or empty) from
/// the passenger-level station that groups them (`location_type` 1); any
/// other value (entrances, generic nodes, boarding areas) plays no role in
/// routing and is kept only for name lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationKind {
    /// A station grouping one or more platforms. Stations have no parent.
    Station,
    /// A boarding platform, usually referencing its station via `parent_station`.
    Platform,
    /// Entrances, pathway nodes and other non-routable records.
    Other,
}

impl LocationKind {
    /// Maps a raw GTFS `location_type` field.
    ///
    /// An absent or empty field means a plain stop/platform, per the GTFS
    /// reference.
    pub fn from_gtfs(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") | Some("0") => LocationKind::Platform,
            Some("1") => LocationKind::Station,
            Some(_) => LocationKind::Other,
        }
    }

    /// Returns true for records passengers can board at.
    pub fn is_boardable(self) -> bool {
        matches!(self, LocationKind::Platform)
    }
}

/// A stop record from the feed.
///
/// `parent` is resolved to a table index at load time; it is `None` both for
/// stations and for standalone stops that never declare a parent.
#[derive(Debug, Clone)]
pub struct Stop {
    /// Opaque GTFS stop id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Station this platform belongs to, if any.
    pub parent: Option<StopIdx>,
    /// Role in the station hierarchy.
    pub location: LocationKind,
}
