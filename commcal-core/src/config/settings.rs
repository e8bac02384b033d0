//! Pipeline tunables.

use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::{CommCalError, CommCalResult};

pub const DEFAULT_LOOKBACK: &str = "24h";
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.85;
pub const DEFAULT_DISPLAY_TIMEZONE: &str = "America/Los_Angeles";
pub const DEFAULT_REFRESH_INTERVAL: &str = "PT1H";

/// Settings loaded from `~/.config/commcal/config.toml` (or `--config`),
/// overridable through `COMMCAL_*` environment variables.
///
/// ```toml
/// lookback = "24h"
/// similarity_threshold = 0.85
/// display_timezone = "America/Los_Angeles"
/// refresh_interval = "PT1H"
/// sources_file = "~/calendars/sources.toml"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// How far before now an event may start and still be kept
    pub lookback: String,
    /// Minimum title similarity for two same-slot events to share a cluster
    pub similarity_threshold: f64,
    /// Zone UTC times are rendered in for JSON output
    pub display_timezone: String,
    pub refresh_interval: String,
    /// Source registry; defaults to `sources.toml` in the input directory
    pub sources_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            lookback: DEFAULT_LOOKBACK.to_string(),
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            display_timezone: DEFAULT_DISPLAY_TIMEZONE.to_string(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL.to_string(),
            sources_file: None,
        }
    }
}

impl Settings {
    pub fn config_path() -> CommCalResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CommCalError::Config("Could not determine config directory".into()))?
            .join("commcal");

        Ok(config_dir.join("config.toml"))
    }

    /// Load settings. An explicit path must exist; the default path is optional.
    pub fn load(path: Option<&Path>) -> CommCalResult<Self> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::config_path()?, false),
        };

        let settings: Settings = Config::builder()
            .add_source(File::from(path).required(required))
            .add_source(Environment::with_prefix("COMMCAL").try_parsing(true))
            .build()
            .map_err(|e| CommCalError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| CommCalError::Config(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> CommCalResult<()> {
        self.lookback_duration()?;
        self.timezone()?;

        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(CommCalError::Config(format!(
                "similarity_threshold must be between 0 and 1, got {}",
                self.similarity_threshold
            )));
        }

        iso8601::duration(&self.refresh_interval).map_err(|e| {
            CommCalError::Config(format!(
                "Invalid refresh_interval '{}': {}",
                self.refresh_interval, e
            ))
        })?;

        Ok(())
    }

    pub fn lookback_duration(&self) -> CommCalResult<chrono::Duration> {
        let std_duration = humantime::parse_duration(&self.lookback).map_err(|e| {
            CommCalError::Config(format!("Invalid lookback '{}': {}", self.lookback, e))
        })?;

        chrono::Duration::from_std(std_duration)
            .map_err(|e| CommCalError::Config(format!("Lookback out of range: {}", e)))
    }

    pub fn timezone(&self) -> CommCalResult<Tz> {
        self.display_timezone.parse::<Tz>().map_err(|e| {
            CommCalError::Config(format!(
                "Invalid display_timezone '{}': {}",
                self.display_timezone, e
            ))
        })
    }

    /// Where the source registry lives for a given input directory.
    pub fn sources_path(&self, input_dir: &Path) -> PathBuf {
        match &self.sources_file {
            Some(p) => PathBuf::from(shellexpand::tilde(&p.to_string_lossy()).into_owned()),
            None => input_dir.join("sources.toml"),
        }
    }
}
