//! Same-timeslot grouping of near-duplicate titles for display.
//!
//! Clustering only annotates: every event comes back out, some carrying a
//! shared `cluster_id`.

mod similarity;

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

pub use similarity::{sequence_ratio, token_set_similarity};

use crate::json::FeedEvent;

/// Minimal union-find over indices, with path halving.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        DisjointSet {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Attach `a`'s set under `b`'s root and return that root.
    fn union(&mut self, a: usize, b: usize) -> usize {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[ra] = rb;
        }
        rb
    }
}

/// Start time truncated to the minute (`2026-02-14T10:00`).
fn slot_key(event: &FeedEvent) -> &str {
    event.start_time.get(..16).unwrap_or(&event.start_time)
}

/// Lower-cased title first; the remaining fields only break ties so the
/// order never depends on input order.
fn order_key(event: &FeedEvent) -> (String, String, String, String, String, String, String) {
    (
        event.title.to_lowercase(),
        event.title.clone(),
        event.location.clone(),
        event.source.clone(),
        event.source_uid.clone(),
        event.start_time.clone(),
        event.url.clone(),
    )
}

/// Whether two events in the same slot may share a cluster.
fn should_link(a: &FeedEvent, b: &FeedEvent, threshold: f64) -> bool {
    if a.title.trim().is_empty() || b.title.trim().is_empty() {
        return false;
    }
    // Same name at two venues is two events
    if !a.location.is_empty() && !b.location.is_empty() && a.location != b.location {
        return false;
    }
    token_set_similarity(&a.title, &b.title) >= threshold
}

/// Group near-duplicate titles within each start-time slot.
///
/// Slots are visited in start-time order. Inside a slot, multi-member
/// clusters come first, ordered by their first title, followed by the
/// unclustered events; everything is ordered by lower-cased title, with the
/// other fields breaking ties. The result does not depend on input order.
/// Cluster ids are sequential across the whole output; unclustered events
/// get `None`.
pub fn cluster_by_title_similarity(events: Vec<FeedEvent>, threshold: f64) -> Vec<FeedEvent> {
    let total = events.len();
    let mut slots: BTreeMap<String, Vec<FeedEvent>> = BTreeMap::new();

    for mut event in events {
        event.cluster_id = None;
        slots.entry(slot_key(&event).to_string()).or_default().push(event);
    }

    let mut next_id = 0;
    let mut result = Vec::with_capacity(total);

    for (_, mut slot) in slots {
        // Linking is order-sensitive once the venue guard refuses a union
        slot.sort_by_cached_key(order_key);
        if slot.len() < 2 {
            result.extend(slot);
            continue;
        }

        let mut sets = DisjointSet::new(slot.len());
        // Venue of each set, tracked at its root so linking through an
        // event with no location cannot join two different venues
        let mut venues: Vec<Option<String>> = slot
            .iter()
            .map(|e| (!e.location.is_empty()).then(|| e.location.clone()))
            .collect();

        for i in 0..slot.len() {
            for j in (i + 1)..slot.len() {
                if !should_link(&slot[i], &slot[j], threshold) {
                    continue;
                }
                let (ri, rj) = (sets.find(i), sets.find(j));
                if ri == rj {
                    continue;
                }
                let venue = match (venues[ri].take(), venues[rj].take()) {
                    (Some(a), Some(b)) if a != b => {
                        venues[ri] = Some(a);
                        venues[rj] = Some(b);
                        continue;
                    }
                    (a, b) => a.or(b),
                };
                let root = sets.union(ri, rj);
                venues[root] = venue;
            }
        }

        let mut clusters: Vec<Vec<FeedEvent>> = Vec::new();
        let mut cluster_index: HashMap<usize, usize> = HashMap::new();
        for (i, event) in slot.into_iter().enumerate() {
            let root = sets.find(i);
            match cluster_index.get(&root) {
                Some(&c) => clusters[c].push(event),
                None => {
                    cluster_index.insert(root, clusters.len());
                    clusters.push(vec![event]);
                }
            }
        }

        let (mut linked, singles): (Vec<_>, Vec<_>) =
            clusters.into_iter().partition(|c| c.len() > 1);

        for cluster in &mut linked {
            cluster.sort_by_cached_key(order_key);
        }
        linked.sort_by_cached_key(|c| order_key(&c[0]));

        let mut singles: Vec<FeedEvent> = singles.into_iter().flatten().collect();
        singles.sort_by_cached_key(order_key);

        for mut cluster in linked {
            debug!(
                "Cluster {}: {} events around '{}'",
                next_id,
                cluster.len(),
                cluster[0].title
            );
            for event in &mut cluster {
                event.cluster_id = Some(next_id);
            }
            next_id += 1;
            result.extend(cluster);
        }
        result.extend(singles);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: f64 = 0.85;

    fn event(title: &str, start: &str, location: &str) -> FeedEvent {
        FeedEvent {
            title: title.to_string(),
            start_time: start.to_string(),
            end_time: start.to_string(),
            location: location.to_string(),
            ..FeedEvent::default()
        }
    }

    fn titles(events: &[FeedEvent]) -> Vec<&str> {
        events.iter().map(|e| e.title.as_str()).collect()
    }

    #[test]
    fn test_qualified_title_clusters_together() {
        let events = vec![
            event("Family Storytime", "2026-02-14T10:00:00", "Central Library"),
            event("Bilingual Family Storytime", "2026-02-14T10:00:00", "Central Library"),
        ];

        let out = cluster_by_title_similarity(events, THRESHOLD);

        assert_eq!(out.len(), 2);
        assert!(out[0].cluster_id.is_some());
        assert_eq!(out[0].cluster_id, out[1].cluster_id);
        assert_eq!(titles(&out), vec!["Bilingual Family Storytime", "Family Storytime"]);
    }

    #[test]
    fn test_sharing_one_word_is_not_enough() {
        let events = vec![
            event("Community Yoga", "2026-02-14T10:00:00", ""),
            event("Community Coffee Tasting", "2026-02-14T10:00:00", ""),
        ];

        let out = cluster_by_title_similarity(events, THRESHOLD);

        assert!(
            out.iter().all(|e| e.cluster_id.is_none()),
            "Expected no clusters, got {:?}",
            out
        );
    }

    #[test]
    fn test_different_locations_never_cluster() {
        let events = vec![
            event("Family Storytime", "2026-02-14T10:00:00", "Central Library"),
            event("Family Storytime", "2026-02-14T10:00:00", "Rincon Valley Library"),
            event("Family Storytime", "2026-02-14T10:00:00", ""),
        ];

        let out = cluster_by_title_similarity(events, THRESHOLD);

        let central = out.iter().find(|e| e.location == "Central Library").unwrap();
        let rincon = out.iter().find(|e| e.location == "Rincon Valley Library").unwrap();
        assert!(
            central.cluster_id.is_none() || central.cluster_id != rincon.cluster_id,
            "Events at different venues share a cluster: {:?}",
            out
        );
        // The venue-less listing joins the venue that sorts first
        let unplaced = out.iter().find(|e| e.location.is_empty()).unwrap();
        assert!(unplaced.cluster_id.is_some());
        assert_eq!(unplaced.cluster_id, central.cluster_id);
    }

    #[test]
    fn test_clustering_keeps_every_event() {
        let events = vec![
            event("Tech Help", "2026-02-14T10:00:00", ""),
            event("", "2026-02-14T10:00:00", ""),
            event("One-On-One Tech Help", "2026-02-14T10:00:30", ""),
            event("Trivia", "2026-02-14T19:00:00", "Brewpub"),
            event("", "2026-02-14T10:00:00", ""),
        ];

        let out = cluster_by_title_similarity(events.clone(), THRESHOLD);

        assert_eq!(out.len(), events.len());
        let mut before = titles(&events);
        let mut after = titles(&out);
        before.sort();
        after.sort();
        assert_eq!(before, after);
        // Seconds are ignored when forming slots; empty titles never link
        assert_eq!(out[0].cluster_id, Some(0));
        assert_eq!(out[1].cluster_id, Some(0));
        assert!(out.iter().filter(|e| e.title.is_empty()).all(|e| e.cluster_id.is_none()));
    }

    #[test]
    fn test_output_order_is_stable() {
        let forward = vec![
            event("Zumba", "2026-02-14T09:00:00", ""),
            event("Family Storytime", "2026-02-14T09:00:00", ""),
            event("Art Class", "2026-02-14T09:00:00", ""),
            event("bilingual family storytime", "2026-02-14T09:00:00", ""),
        ];
        let mut backward = forward.clone();
        backward.reverse();

        let a = cluster_by_title_similarity(forward, THRESHOLD);
        let b = cluster_by_title_similarity(backward, THRESHOLD);

        assert_eq!(a, b);
        assert_eq!(
            titles(&a),
            vec!["bilingual family storytime", "Family Storytime", "Art Class", "Zumba"]
        );
    }

    #[test]
    fn test_same_title_at_two_branches_orders_by_location() {
        let forward = vec![
            event("Storytime", "2026-02-14T10:00:00", "Central Library"),
            event("Storytime", "2026-02-14T10:00:00", "Rincon Valley Library"),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();

        let a = cluster_by_title_similarity(forward, THRESHOLD);
        let b = cluster_by_title_similarity(reversed, THRESHOLD);

        assert_eq!(a, b);
        let locations: Vec<&str> = a.iter().map(|e| e.location.as_str()).collect();
        assert_eq!(locations, vec!["Central Library", "Rincon Valley Library"]);
        assert!(a.iter().all(|e| e.cluster_id.is_none()));
    }

    #[test]
    fn test_venue_guard_result_ignores_input_order() {
        let events = vec![
            event("Family Storytime", "2026-02-14T10:00:00", "Rincon Valley Library"),
            event("Family Storytime", "2026-02-14T10:00:00", ""),
            event("Family Storytime", "2026-02-14T10:00:00", "Central Library"),
        ];
        let mut reversed = events.clone();
        reversed.reverse();

        assert_eq!(
            cluster_by_title_similarity(events, THRESHOLD),
            cluster_by_title_similarity(reversed, THRESHOLD)
        );
    }

    #[test]
    fn test_slots_follow_start_time() {
        let events = vec![
            event("Trivia", "2026-02-14T19:00:00", ""),
            event("Tech Help", "2026-02-14T10:00:00", ""),
            event("Drop-in Tech Help", "2026-02-14T10:00:00", ""),
        ];

        let out = cluster_by_title_similarity(events, THRESHOLD);

        assert_eq!(titles(&out), vec!["Drop-in Tech Help", "Tech Help", "Trivia"]);
        assert_eq!(out[0].cluster_id, Some(0));
    }

    #[test]
    fn test_cluster_ids_are_unique_across_slots() {
        let events = vec![
            event("Family Storytime", "2026-02-14T10:00:00", ""),
            event("Bilingual Family Storytime", "2026-02-14T10:00:00", ""),
            event("Tech Help", "2026-02-15T10:00:00", ""),
            event("Drop-in Tech Help", "2026-02-15T10:00:00", ""),
            event("Tech Help", "2026-02-16T10:00:00", ""),
        ];

        let out = cluster_by_title_similarity(events, THRESHOLD);

        let ids: Vec<Option<usize>> = out.iter().map(|e| e.cluster_id).collect();
        assert_eq!(ids, vec![Some(0), Some(0), Some(1), Some(1), None]);
    }
}
