//! VEVENT block extraction with source attribution.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::event::EventRecord;

fn vevent_pattern() -> &'static Regex {
    static VEVENT: OnceLock<Regex> = OnceLock::new();
    VEVENT.get_or_init(|| {
        Regex::new(r"(?s)BEGIN:VEVENT\r?\n(.*?)\r?\nEND:VEVENT").expect("vevent pattern is valid")
    })
}

/// Attribution attached to every record extracted from one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    /// Human-readable provider name (`X-SOURCE`)
    pub name: String,
    /// Stable scraper identifier, the file stem (`X-SOURCE-ID`)
    pub id: String,
    /// Used when a record has no URL of its own
    pub fallback_url: Option<String>,
}

/// Extract every VEVENT with a usable DTSTART from ICS text.
///
/// Blocks whose start cannot be parsed are dropped silently. When `source`
/// is given, missing `URL`, `X-SOURCE`, `X-SOURCE-ID` and `X-SOURCE-URLS`
/// properties are injected into the raw block.
pub fn extract_events(content: &str, source: Option<&SourceInfo>) -> Vec<EventRecord> {
    vevent_pattern()
        .captures_iter(content)
        .filter_map(|caps| EventRecord::from_block(&caps[1]))
        .map(|mut record| {
            if let Some(source) = source {
                attach_source(&mut record, source);
            }
            record
        })
        .collect()
}

fn attach_source(record: &mut EventRecord, source: &SourceInfo) {
    if let Some(ref url) = source.fallback_url {
        if !record.has_property("URL") {
            record.prepend_raw_property("URL", url);
        }
    }

    if !record.has_property("X-SOURCE") {
        record.prepend_property("X-SOURCE", &source.name);
    }
    if !record.has_property("X-SOURCE-ID") {
        record.prepend_raw_property("X-SOURCE-ID", &source.id);
    }

    // Every record carries a source -> URL map, not only merged ones
    if !record.has_property("X-SOURCE-URLS") {
        if let (Some(name), Some(url)) = (record.source(), record.url()) {
            let urls = BTreeMap::from([(name, url)]);
            if let Ok(json) = serde_json::to_string(&urls) {
                record.prepend_raw_property("X-SOURCE-URLS", &json);
            }
        }
    }
}
