//! Duplicate elimination: exact UID repeats, then cross-source duplicates.

mod cross_source;
mod policy;
mod uid;

pub use cross_source::{CrossSourceStats, DedupKey, dedup_key, dedupe_cross_source, normalize_title};
pub use policy::{AGGREGATOR_RANK, DedupPolicy, POLICY_FILE, UNRANKED};
pub use uid::dedupe_by_uid;
