//! Time and geographic filtering of extracted records.

mod geo;
mod time;

pub use geo::CityFilter;
pub use time::{cutoff, retain_upcoming};
