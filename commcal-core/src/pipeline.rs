//! Directory-level merge: per-source ICS files in, one combined feed out.
//!
//! Failures tied to a single source file (unreadable file, bad policy or
//! cities file) are logged and skipped. Only a missing input directory or an
//! unwritable output aborts the run.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::{Settings, SourceRegistry};
use crate::dedup::{CrossSourceStats, DedupPolicy, dedupe_by_uid, dedupe_cross_source};
use crate::error::{CommCalError, CommCalResult};
use crate::event::EventRecord;
use crate::filter::{CityFilter, cutoff, retain_upcoming};
use crate::ics::{FeedMetadata, extract_events, generate_feed};

/// Never read as a source, even when it is not the current output.
const COMBINED_FILE: &str = "combined.ics";

#[derive(Debug, Clone)]
pub struct CombineOptions {
    pub calendar_name: String,
    /// Source file stems to skip (`cal_theatre` or `cal_theatre.ics`)
    pub exclude: Vec<String>,
    pub settings: Settings,
    pub now: DateTime<Utc>,
}

impl CombineOptions {
    pub fn new(calendar_name: impl Into<String>, settings: Settings) -> Self {
        CombineOptions {
            calendar_name: calendar_name.into(),
            exclude: Vec::new(),
            settings,
            now: Utc::now(),
        }
    }

    fn is_excluded(&self, stem: &str) -> bool {
        self.exclude
            .iter()
            .map(|x| x.trim())
            .any(|x| x.strip_suffix(".ics").unwrap_or(x) == stem)
    }
}

/// Events contributed by one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCount {
    pub file: String,
    pub source: String,
    pub events: usize,
}

#[derive(Debug, Clone, Default)]
pub struct CombineStats {
    pub sources: Vec<SourceCount>,
    /// Files that could not be read
    pub failed: Vec<String>,
    pub excluded: Vec<String>,
    pub geo_filtered: usize,
    pub uid_removed: usize,
    pub cross_source: CrossSourceStats,
    /// Events in the combined output
    pub total: usize,
}

/// Merge every `*.ics` in `input_dir` and write the combined feed to `output`.
pub fn combine_directory(
    input_dir: &Path,
    output: &Path,
    options: &CombineOptions,
) -> CommCalResult<CombineStats> {
    let (records, stats) = combine_events(input_dir, output, options)?;

    let meta = FeedMetadata {
        calendar_name: options.calendar_name.clone(),
        refresh_interval: options.settings.refresh_interval.clone(),
    };
    let ics = generate_feed(&records, &meta);

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output, ics)?;

    info!("Wrote {} events to {}", stats.total, output.display());
    Ok(stats)
}

/// Run the pipeline without writing anything. `output` is only used to keep
/// a previous run's output from being read back in as a source.
pub fn combine_events(
    input_dir: &Path,
    output: &Path,
    options: &CombineOptions,
) -> CommCalResult<(Vec<EventRecord>, CombineStats)> {
    if !input_dir.is_dir() {
        return Err(CommCalError::Config(format!(
            "Input directory not found: {}",
            input_dir.display()
        )));
    }

    let mut stats = CombineStats::default();
    let registry = load_registry(&options.settings.sources_path(input_dir));
    let city_filter = load_city_filter(input_dir);
    let policy = DedupPolicy::load(input_dir);
    let cut = cutoff(options.now, options.settings.lookback_duration()?);

    let mut records: Vec<EventRecord> = Vec::new();

    for path in source_files(input_dir, output)? {
        let file = file_name(&path);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        if options.is_excluded(&stem) {
            info!("Skipping excluded source {}", file);
            stats.excluded.push(file);
            continue;
        }

        let content = match std::fs::read(&path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                warn!("Error reading {}: {}", file, e);
                stats.failed.push(file);
                continue;
            }
        };

        let source = registry.source_info(&stem);
        let mut upcoming = retain_upcoming(extract_events(&content, Some(&source)), cut);
        if let Some(filter) = &city_filter {
            let before = upcoming.len();
            upcoming.retain(|r| filter.allows(r.location().as_deref()));
            stats.geo_filtered += before - upcoming.len();
        }
        info!("{} future events from {} ({})", upcoming.len(), file, source.name);

        stats.sources.push(SourceCount {
            file,
            source: source.name,
            events: upcoming.len(),
        });
        records.extend(upcoming);
    }

    if stats.geo_filtered > 0 {
        info!("Geo filter: removed {} events outside allowed cities", stats.geo_filtered);
    }

    records.sort_by_key(|r| r.start().sort_key());

    let (records, uid_removed) = dedupe_by_uid(records);
    stats.uid_removed = uid_removed;
    if uid_removed > 0 {
        info!("UID dedup: removed {} repeated events", uid_removed);
    }

    let (records, cross) = dedupe_cross_source(records, &policy);
    stats.cross_source = cross;
    stats.total = records.len();

    Ok((records, stats))
}

/// `*.ics` files in name order, excluding the output and `combined.ics`.
fn source_files(input_dir: &Path, output: &Path) -> CommCalResult<Vec<PathBuf>> {
    let output_name = output.file_name();
    let mut files: Vec<PathBuf> = std::fs::read_dir(input_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| path.extension().is_some_and(|ext| ext == "ics"))
        .filter(|path| {
            let name = path.file_name();
            name != output_name && name.is_some_and(|n| n != COMBINED_FILE)
        })
        .collect();

    files.sort();
    debug!("Found {} source files in {}", files.len(), input_dir.display());
    Ok(files)
}

fn load_registry(path: &Path) -> SourceRegistry {
    SourceRegistry::load(path).unwrap_or_else(|e| {
        warn!("Ignoring source registry: {}", e);
        SourceRegistry::default()
    })
}

fn load_city_filter(input_dir: &Path) -> Option<CityFilter> {
    match CityFilter::load(input_dir) {
        Ok(Some(filter)) => {
            info!(
                "Geo filter: {} allowed, {} excluded cities",
                filter.allowed.len(),
                filter.excluded.len()
            );
            Some(filter)
        }
        Ok(None) => None,
        Err(e) => {
            warn!("Ignoring allowed cities file: {}", e);
            None
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
