//! Compact table indices.
//!
//! GTFS identifiers are opaque strings. The feed store interns every entity
//! at load time and hands out `u32`-backed indices; all hot-path structures
//! (connections, search labels) carry indices and resolve back to strings
//! only when a journey is rendered.

macro_rules! table_index {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            /// Returns the index as a usize for table access.
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<usize> for $name {
            fn from(value: usize) -> Self {
                $name(value as u32)
            }
        }
    };
}

table_index! {
    /// Index of a stop in the feed store's stop table.
    StopIdx
}

table_index! {
    /// Index of a trip in the feed store's trip table.
    TripIdx
}

table_index! {
    /// Index of a route in the feed store's route table.
    RouteIdx
}

table_index! {
    /// Index of a service in the feed store's service table.
    ServiceIdx
}
