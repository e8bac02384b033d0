//! Source priority for choosing between cross-source duplicates.

use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::config::pattern_matches;
use crate::error::{CommCalError, CommCalResult};

pub const POLICY_FILE: &str = "dedup_policy.json";

/// Rank of a source missing from `source_priority`.
pub const UNRANKED: usize = 1_000_000;
/// Rank of an aggregator, below every other source.
pub const AGGREGATOR_RANK: usize = UNRANKED + 1;

/// Contents of `dedup_policy.json`:
///
/// ```json
/// {
///   "source_priority": ["City Gov", "Sonoma County Library", "Meetup*"],
///   "aggregators": ["North Bay Bohemian", "Press Democrat"]
/// }
/// ```
///
/// Patterns are exact source names or `prefix*`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DedupPolicy {
    #[serde(default)]
    pub source_priority: Vec<String>,
    #[serde(default)]
    pub aggregators: Vec<String>,
}

impl DedupPolicy {
    pub fn from_json(content: &str) -> CommCalResult<Self> {
        serde_json::from_str(content).map_err(|e| CommCalError::Policy(e.to_string()))
    }

    /// Load the policy from a city directory. A missing file is an empty
    /// policy; an unreadable or malformed one is logged and treated as empty.
    pub fn load(input_dir: &Path) -> Self {
        let path = input_dir.join(POLICY_FILE);
        if !path.exists() {
            return Self::default();
        }

        let parsed = std::fs::read_to_string(&path)
            .map_err(CommCalError::from)
            .and_then(|content| Self::from_json(&content));

        match parsed {
            Ok(policy) => policy,
            Err(e) => {
                warn!("Ignoring {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn is_aggregator(&self, source: &str) -> bool {
        self.aggregators.iter().any(|p| pattern_matches(p, source))
    }

    /// Lower is better. An explicit priority entry beats aggregator status.
    pub fn rank(&self, source: Option<&str>) -> usize {
        let Some(source) = source else {
            return UNRANKED;
        };

        if let Some(index) = self
            .source_priority
            .iter()
            .position(|p| pattern_matches(p, source))
        {
            return index;
        }

        if self.is_aggregator(source) {
            AGGREGATOR_RANK
        } else {
            UNRANKED
        }
    }
}
