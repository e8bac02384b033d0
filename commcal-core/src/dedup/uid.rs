use std::collections::HashSet;

use crate::event::EventRecord;

/// Keep the first record for each UID. Records without a UID always pass,
/// since many scrapers never emit one.
///
/// Returns the kept records in their original order and the number removed.
pub fn dedupe_by_uid(records: Vec<EventRecord>) -> (Vec<EventRecord>, usize) {
    let before = records.len();
    let mut seen: HashSet<String> = HashSet::new();

    let kept: Vec<EventRecord> = records
        .into_iter()
        .filter(|record| match record.uid() {
            Some(uid) => seen.insert(uid),
            None => true,
        })
        .collect();

    let removed = before - kept.len();
    (kept, removed)
}
