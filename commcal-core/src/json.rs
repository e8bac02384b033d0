//! Flattened JSON export of a combined feed.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cluster::cluster_by_title_similarity;
use crate::config::Settings;
use crate::error::CommCalResult;
use crate::event::EventRecord;
use crate::filter::{cutoff, retain_upcoming};
use crate::ics::extract_events;

/// One event as published to the website.
///
/// Missing text fields are empty strings; times are local ISO-8601 strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedEvent {
    pub title: String,
    pub start_time: String,
    pub end_time: String,
    pub location: String,
    pub description: String,
    pub url: String,
    pub city: String,
    pub source: String,
    pub source_id: String,
    pub source_uid: String,
    pub source_urls: Option<BTreeMap<String, String>>,
    pub cluster_id: Option<usize>,
}

impl FeedEvent {
    pub fn from_record(record: &EventRecord, city: &str, tz: Tz) -> Self {
        let source_urls = record.source_urls();

        FeedEvent {
            title: record.title(),
            start_time: record.start().to_local_string(tz),
            end_time: record.end().to_local_string(tz),
            location: record.location().unwrap_or_default(),
            description: record.description().unwrap_or_default(),
            url: record.url().unwrap_or_default(),
            city: city.to_string(),
            source: record.source().unwrap_or_default(),
            source_id: record.source_id().unwrap_or_default(),
            source_uid: record.uid().unwrap_or_default(),
            source_urls: (!source_urls.is_empty()).then_some(source_urls),
            cluster_id: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct JsonOptions {
    pub city: Option<String>,
    /// Drop events starting before `now - lookback`
    pub future_only: bool,
    pub now: DateTime<Utc>,
    pub lookback: Duration,
    pub timezone: Tz,
    pub similarity_threshold: f64,
}

impl JsonOptions {
    pub fn from_settings(settings: &Settings, now: DateTime<Utc>) -> CommCalResult<Self> {
        Ok(JsonOptions {
            city: None,
            future_only: true,
            now,
            lookback: settings.lookback_duration()?,
            timezone: settings.timezone()?,
            similarity_threshold: settings.similarity_threshold,
        })
    }
}

/// Flatten, filter, sort and cluster the events of an ICS document.
pub fn flatten_feed(ics: &str, options: &JsonOptions) -> Vec<FeedEvent> {
    let mut records = extract_events(ics, None);
    if options.future_only {
        records = retain_upcoming(records, cutoff(options.now, options.lookback));
    }

    let city = options.city.as_deref().unwrap_or("");
    let mut events: Vec<FeedEvent> = records
        .iter()
        .map(|r| FeedEvent::from_record(r, city, options.timezone))
        .collect();
    events.sort_by(|a, b| a.start_time.cmp(&b.start_time));

    debug!("Clustering {} events", events.len());
    cluster_by_title_similarity(events, options.similarity_threshold)
}

/// Pretty-printed JSON array for an ICS document.
pub fn to_json(ics: &str, options: &JsonOptions) -> CommCalResult<String> {
    let events = flatten_feed(ics, options);
    Ok(serde_json::to_string_pretty(&events)?)
}
