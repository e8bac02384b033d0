use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use commcal_core::{JsonOptions, Settings, flatten_feed};
use tracing::{debug, info};

pub fn run(
    input: &Path,
    output: Option<&Path>,
    city: Option<String>,
    all: bool,
    settings: &Settings,
) -> Result<()> {
    let bytes = std::fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let ics = String::from_utf8_lossy(&bytes);

    let mut options = JsonOptions::from_settings(settings, Utc::now())?;
    options.city = city;
    options.future_only = !all;

    debug!(
        "Flattening {} (future only: {}, city: {:?})",
        input.display(),
        options.future_only,
        options.city
    );
    let events = flatten_feed(&ics, &options);
    let json = serde_json::to_string_pretty(&events)?;

    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            let clustered = events.iter().filter(|e| e.cluster_id.is_some()).count();
            info!(
                "Converted {} events to {} ({} in clusters)",
                events.len(),
                path.display(),
                clustered
            );
        }
        None => println!("{}", json),
    }

    Ok(())
}
