//! Allow-list geo filtering on free-form location strings.
//!
//! Many sources give only a venue name, so the filter is applied only to
//! locations that look like an address. A bare venue name carries no geo
//! information and is kept.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::CommCalResult;

pub const CITIES_FILE: &str = "allowed_cities.txt";

/// Locations that always pass: virtual events, bare URLs, and Meetup's
/// habit of putting the timezone in the location field.
const VIRTUAL_LOCATION_PATTERNS: &[&str] = &[
    "zoom",
    "online",
    "virtual",
    "webinar",
    "http://",
    "https://",
    "america/los_angeles",
    "america/new_york",
];

fn address_pattern() -> &'static Regex {
    static ADDRESS: OnceLock<Regex> = OnceLock::new();
    ADDRESS.get_or_init(|| {
        Regex::new(concat!(
            r"(?i)(?:",
            r", [A-Z]{2}\b|",
            r"\b\d{5}\b|",
            r", [A-Z][a-z]+ [A-Z]{2}|",
            r"\d+\s+\w+\s+(?:street|st|avenue|ave|road|rd|drive|dr|boulevard|blvd|lane|ln|way|court|ct)\b",
            r")"
        ))
        .expect("address pattern is valid")
    })
}

/// Whether a location string carries address structure worth checking:
/// `, CA`, a ZIP code, `, Santa Rosa CA`, or `123 Main St`.
pub fn looks_like_address(location: &str) -> bool {
    address_pattern().is_match(location)
}

/// Allowed and hard-excluded city names, lower-cased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CityFilter {
    pub allowed: BTreeSet<String>,
    pub excluded: BTreeSet<String>,
}

impl CityFilter {
    /// Parse `allowed_cities.txt`.
    ///
    /// ```text
    /// # Sonoma County
    /// Petaluma      # 38.23, -122.63
    /// Santa Rosa
    /// !Sonoma       # different city, same county name
    /// ```
    ///
    /// Returns `None` when no allowed city is listed, which disables the filter.
    pub fn parse(content: &str) -> Option<Self> {
        let mut filter = CityFilter::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let city = line.split('#').next().unwrap_or("").trim();
            if let Some(excluded) = city.strip_prefix('!') {
                let excluded = excluded.trim();
                if !excluded.is_empty() {
                    filter.excluded.insert(excluded.to_lowercase());
                }
            } else if !city.is_empty() {
                filter.allowed.insert(city.to_lowercase());
            }
        }

        (!filter.allowed.is_empty()).then_some(filter)
    }

    /// Load `allowed_cities.txt` from a city directory. A missing file means no filter.
    pub fn load(input_dir: &Path) -> CommCalResult<Option<Self>> {
        let path = input_dir.join(CITIES_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(Self::parse(&content))
    }

    /// Whether an event at `location` belongs in this city's feed.
    pub fn allows(&self, location: Option<&str>) -> bool {
        let Some(location) = location.filter(|l| !l.trim().is_empty()) else {
            return true;
        };
        let lower = location.to_lowercase();

        if VIRTUAL_LOCATION_PATTERNS.iter().any(|p| lower.contains(p)) {
            return true;
        }

        // Excluded cities apply even without address structure
        if self.excluded.iter().any(|city| lower.contains(city.as_str())) {
            return false;
        }

        if !looks_like_address(location) {
            return true;
        }

        self.allowed.iter().any(|city| lower.contains(city.as_str()))
    }
}
