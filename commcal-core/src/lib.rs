//! Core pipeline for commcal.
//!
//! Turns a directory of per-source ICS files into one community calendar:
//! - `ics` for extracting records and writing the combined feed
//! - `filter` for the time window and city allow-list
//! - `dedup` for UID and cross-source duplicate removal
//! - `cluster` for grouping near-duplicate titles in JSON output
//! - `pipeline` for the directory-level entry point

pub mod cluster;
pub mod config;
pub mod dedup;
pub mod error;
pub mod event;
pub mod filter;
pub mod ics;
pub mod json;
pub mod pipeline;

pub use config::{Settings, SourceRegistry};
pub use error::{CommCalError, CommCalResult};
pub use event::{ContentLine, EventRecord, EventTime};
pub use json::{FeedEvent, JsonOptions, flatten_feed, to_json};
pub use pipeline::{CombineOptions, CombineStats, SourceCount, combine_directory, combine_events};
