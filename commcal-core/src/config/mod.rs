//! Configuration for the merge pipeline.

mod settings;
mod sources;

pub use settings::{
    DEFAULT_DISPLAY_TIMEZONE, DEFAULT_LOOKBACK, DEFAULT_REFRESH_INTERVAL,
    DEFAULT_SIMILARITY_THRESHOLD, Settings,
};
pub use sources::{SourceOverride, SourceRegistry, default_source_name, pattern_matches};
