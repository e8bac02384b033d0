//! Cross-source duplicate merging.
//!
//! Independent sources assign their own UIDs, so the same occurrence listed
//! by a venue and by an aggregator is matched on `(date, normalized title)`
//! instead. Each group collapses to its best-ranked record, which inherits
//! the attribution of everything it absorbed.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use tracing::{debug, info};

use super::policy::DedupPolicy;
use crate::event::EventRecord;

const KEY_TITLE_LEN: usize = 40;
/// Shortest normalized title allowed to absorb a longer one
const MIN_PREFIX_LEN: usize = 12;
const MAX_PREFIX_RATIO: f64 = 0.75;

pub type DedupKey = (NaiveDate, String);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CrossSourceStats {
    /// Records dropped in favour of a better-ranked duplicate
    pub removed: usize,
    /// Groups folded into a shorter same-date title
    pub prefix_merges: usize,
}

/// `The Farmers' Market!` → `farmersmarket`
///
/// Drops one leading article, keeps alphanumerics only, lowercases, and
/// truncates to 40 characters.
pub fn normalize_title(title: &str) -> String {
    let mut rest = title.trim();
    for article in ["the ", "a ", "an "] {
        if rest
            .get(..article.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(article))
        {
            rest = &rest[article.len()..];
            break;
        }
    }

    rest.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .take(KEY_TITLE_LEN)
        .collect()
}

/// Grouping key, or `None` for records without a usable title. Those are
/// never treated as duplicates of each other.
pub fn dedup_key(record: &EventRecord) -> Option<DedupKey> {
    let title = normalize_title(&record.title());
    (!title.is_empty()).then(|| (record.start().date(), title))
}

struct Group {
    key: DedupKey,
    /// `(input position, record)`
    members: Vec<(usize, EventRecord)>,
}

/// Collapse duplicates across sources and re-sort by start time.
pub fn dedupe_cross_source(
    records: Vec<EventRecord>,
    policy: &DedupPolicy,
) -> (Vec<EventRecord>, CrossSourceStats) {
    let mut stats = CrossSourceStats::default();
    let mut kept: Vec<(usize, EventRecord)> = Vec::new();
    let mut groups: Vec<Group> = Vec::new();
    let mut index: HashMap<DedupKey, usize> = HashMap::new();

    for (pos, record) in records.into_iter().enumerate() {
        let Some(key) = dedup_key(&record) else {
            kept.push((pos, record));
            continue;
        };
        match index.get(&key) {
            Some(&i) => groups[i].members.push((pos, record)),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(Group {
                    key,
                    members: vec![(pos, record)],
                });
            }
        }
    }

    stats.prefix_merges = merge_prefix_groups(&mut groups, policy);

    for group in groups {
        match group.members.len() {
            0 => {}
            1 => kept.extend(group.members),
            n => {
                stats.removed += n - 1;
                debug!(
                    "Collapsing {} records for '{}' on {}",
                    n, group.key.1, group.key.0
                );
                kept.push(collapse(group.members, policy));
            }
        }
    }

    if stats.removed > 0 {
        info!("Cross-source dedup: removed {} duplicate events", stats.removed);
    }

    kept.sort_by_key(|(pos, _)| *pos);
    let mut records: Vec<EventRecord> = kept.into_iter().map(|(_, r)| r).collect();
    records.sort_by_key(|r| r.start().sort_key());

    (records, stats)
}

/// Fold same-date groups whose title extends a shorter one
/// ("Hands on a Hardbody at Spreckels Performing Arts Center" into
/// "Hands on a Hardbody"). Only applies when an aggregator is involved,
/// since venues legitimately run "After School Club" and
/// "After School Club Robotics" side by side.
fn merge_prefix_groups(groups: &mut [Group], policy: &DedupPolicy) -> usize {
    let mut by_date: BTreeMap<NaiveDate, Vec<usize>> = BTreeMap::new();
    for (i, group) in groups.iter().enumerate() {
        by_date.entry(group.key.0).or_default().push(i);
    }

    let mut merges = 0;
    for (date, mut ids) in by_date {
        if ids.len() < 2 {
            continue;
        }
        ids.sort_by_key(|&i| groups[i].key.1.chars().count());
        let mut absorbed = vec![false; ids.len()];

        for a in 0..ids.len() {
            if absorbed[a] {
                continue;
            }
            let short = groups[ids[a]].key.1.clone();
            let short_len = short.chars().count();
            if short_len < MIN_PREFIX_LEN {
                continue;
            }

            for b in (a + 1)..ids.len() {
                if absorbed[b] {
                    continue;
                }
                let long = &groups[ids[b]].key.1;
                let long_len = long.chars().count();
                if !long.starts_with(short.as_str())
                    || short_len as f64 / long_len as f64 > MAX_PREFIX_RATIO
                {
                    continue;
                }

                let has_aggregator = groups[ids[a]]
                    .members
                    .iter()
                    .chain(groups[ids[b]].members.iter())
                    .any(|(_, r)| r.source().is_some_and(|s| policy.is_aggregator(&s)));
                if !has_aggregator {
                    continue;
                }

                info!("Prefix dedup: merged '{}' into '{}' on {}", long, short, date);
                let moved = std::mem::take(&mut groups[ids[b]].members);
                groups[ids[a]].members.extend(moved);
                absorbed[b] = true;
                merges += 1;
            }
        }
    }

    merges
}

/// Pick the survivor (rank, then source id, then input order) and record
/// every contributing source on it.
fn collapse(mut members: Vec<(usize, EventRecord)>, policy: &DedupPolicy) -> (usize, EventRecord) {
    let winner = members
        .iter()
        .enumerate()
        .min_by_key(|(_, (pos, r))| {
            (
                policy.rank(r.source().as_deref()),
                r.source_id().unwrap_or_default(),
                *pos,
            )
        })
        .map(|(i, _)| i)
        .unwrap_or(0);

    let mut sources: BTreeSet<String> = BTreeSet::new();
    let mut urls: BTreeMap<String, String> = BTreeMap::new();
    for (_, record) in &members {
        if let Some(merged) = record.field("X-MERGED-SOURCES") {
            sources.extend(
                merged
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from),
            );
        }
        urls.extend(record.source_urls());
        if let (Some(source), Some(url)) = (record.source(), record.url()) {
            urls.insert(source, url);
        }
        if let Some(source) = record.source() {
            sources.insert(source);
        }
    }

    let (pos, mut survivor) = members.swap_remove(winner);
    // The survivor's own link wins for its own source name
    if let (Some(source), Some(url)) = (survivor.source(), survivor.url()) {
        urls.insert(source, url);
    }

    if sources.len() > 1 {
        let joined = sources.into_iter().collect::<Vec<_>>().join(", ");
        survivor.set_property("X-MERGED-SOURCES", &joined);
    }
    if !urls.is_empty() {
        if let Ok(json) = serde_json::to_string(&urls) {
            survivor.set_raw_property("X-SOURCE-URLS", &json);
        }
    }

    (pos, survivor)
}
