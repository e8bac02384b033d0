//! Source registry: friendly names and fallback URLs per source file.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{CommCalError, CommCalResult};
use crate::ics::SourceInfo;

/// Contents of `sources.toml`.
///
/// Keys are source ids (file stems) or `prefix*` patterns:
///
/// ```toml
/// [sources.arlene_francis_theater]
/// name = "Arlene Francis Center"
///
/// [sources."SRCity_*"]
/// name = "City of Santa Rosa"
/// url = "https://www.srcity.org/calendar.aspx"
/// ```
#[derive(Debug, Default, Clone, Deserialize)]
pub struct SourceRegistry {
    #[serde(default)]
    pub sources: BTreeMap<String, SourceOverride>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct SourceOverride {
    pub name: Option<String>,
    pub url: Option<String>,
}

impl SourceRegistry {
    /// Load the registry; a missing file is an empty registry.
    pub fn load(path: &Path) -> CommCalResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| CommCalError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Override for a source id: an exact key wins, then the longest matching prefix.
    fn lookup(&self, source_id: &str) -> Option<&SourceOverride> {
        if let Some(exact) = self.sources.get(source_id) {
            return Some(exact);
        }

        self.sources
            .iter()
            .filter(|(pattern, _)| pattern.ends_with('*') && pattern_matches(pattern, source_id))
            .max_by_key(|(pattern, _)| pattern.len())
            .map(|(_, over)| over)
    }

    /// Attribution for the file with stem `source_id`.
    pub fn source_info(&self, source_id: &str) -> SourceInfo {
        let over = self.lookup(source_id);

        SourceInfo {
            name: over
                .and_then(|o| o.name.clone())
                .unwrap_or_else(|| default_source_name(source_id)),
            id: source_id.to_string(),
            fallback_url: over.and_then(|o| o.url.clone()),
        }
    }
}

/// `pattern` is either an exact name or `prefix*`.
pub fn pattern_matches(pattern: &str, value: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => value.starts_with(prefix),
        None => pattern == value,
    }
}

/// `sonoma_county_library` → `Sonoma County Library`
pub fn default_source_name(source_id: &str) -> String {
    let words: Vec<&str> = source_id.split('_').filter(|w| !w.is_empty()).collect();
    let mut name = String::with_capacity(source_id.len());
    let mut prev_alpha = false;

    // A letter starts a word whenever the previous character is not a letter
    for c in words.join(" ").chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                name.extend(c.to_lowercase());
            } else {
                name.extend(c.to_uppercase());
            }
        } else {
            name.push(c);
        }
        prev_alpha = c.is_alphabetic();
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SourceRegistry {
        toml::from_str(
            r#"
[sources.cal_theatre]
name = "Cal Theatre"
url = "https://caltheatre.com/"

[sources."SRCity_*"]
name = "City of Santa Rosa"
url = "https://www.srcity.org/calendar.aspx"

[sources."SRCity_parks*"]
name = "Santa Rosa Parks"
"#,
        )
        .expect("Registry fixture should parse")
    }

    #[test]
    fn test_default_source_name_title_cases_stem() {
        assert_eq!(default_source_name("sonoma_county_library"), "Sonoma County Library");
        assert_eq!(default_source_name("MYSTIC_theatre"), "Mystic Theatre");
    }

    #[test]
    fn test_default_source_name_capitalizes_after_punctuation() {
        assert_eq!(default_source_name("o'reilly_books"), "O'Reilly Books");
        assert_eq!(default_source_name("cal-theatre__2nd_street"), "Cal-Theatre 2Nd Street");
    }

    #[test]
    fn test_exact_entry_wins() {
        let info = registry().source_info("cal_theatre");
        assert_eq!(info.name, "Cal Theatre");
        assert_eq!(info.fallback_url.as_deref(), Some("https://caltheatre.com/"));
        assert_eq!(info.id, "cal_theatre");
    }

    #[test]
    fn test_longest_prefix_wins() {
        let registry = registry();

        let council = registry.source_info("SRCity_council");
        assert_eq!(council.name, "City of Santa Rosa");
        assert_eq!(
            council.fallback_url.as_deref(),
            Some("https://www.srcity.org/calendar.aspx")
        );

        let parks = registry.source_info("SRCity_parks_rec");
        assert_eq!(parks.name, "Santa Rosa Parks");
        assert_eq!(parks.fallback_url, None);
    }

    #[test]
    fn test_unknown_source_uses_stem() {
        let info = registry().source_info("lagunitas");
        assert_eq!(info.name, "Lagunitas");
        assert_eq!(info.fallback_url, None);
    }

    #[test]
    fn test_pattern_matches() {
        assert!(pattern_matches("Meetup*", "Meetup: Go Wild Hikers"));
        assert!(pattern_matches("City Gov", "City Gov"));
        assert!(!pattern_matches("City Gov", "City Government"));
        assert!(pattern_matches("*", "anything"));
    }

    #[test]
    fn test_missing_registry_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SourceRegistry::load(&dir.path().join("sources.toml")).unwrap();
        assert!(registry.sources.is_empty());
    }
}
