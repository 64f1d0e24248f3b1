//! Domain types for the journey planner.
//!
//! This module contains the core domain model types that represent
//! validated timetable data. Types enforce their invariants at construction
//! time, so code that receives them can trust their validity.

mod calendar;
mod ids;
mod segment;
mod stop;
mod time;
mod trip;

pub use calendar::{Calendar, ExceptionType};
pub use ids::{RouteIdx, ServiceIdx, StopIdx, TripIdx};
pub use segment::{DomainError, Journey, RouteSegment};
pub use stop::{LocationKind, Stop};
pub use time::{DateError, GtfsTime, TimeError, parse_service_date};
pub use trip::{Route, StopTime, Trip};
