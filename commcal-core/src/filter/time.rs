//! Future-only filtering.

use chrono::{DateTime, Duration, Utc};

use crate::event::EventRecord;

/// Earliest start kept: `now - lookback`.
///
/// The margin keeps same-day events whose source and viewer disagree on
/// the zone.
pub fn cutoff(now: DateTime<Utc>, lookback: Duration) -> DateTime<Utc> {
    now - lookback
}

/// Keep records starting at or after `cutoff`. Naive starts compare as UTC.
pub fn retain_upcoming(records: Vec<EventRecord>, cutoff: DateTime<Utc>) -> Vec<EventRecord> {
    records
        .into_iter()
        .filter(|r| r.start().sort_key() >= cutoff)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ics::extract_events;
    use chrono::TimeZone;

    fn record(dtstart: &str) -> EventRecord {
        let ics = format!("BEGIN:VEVENT\r\nDTSTART:{}\r\nSUMMARY:x\r\nEND:VEVENT", dtstart);
        extract_events(&ics, None).remove(0)
    }

    #[test]
    fn test_all_day_event_today_survives_lookback() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 20, 0, 0).unwrap();
        let cut = cutoff(now, Duration::hours(24));

        let kept = retain_upcoming(vec![record("20260101"), record("20251230")], cut);

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].start().to_string(), "2026-01-01");
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let now = Utc.with_ymd_and_hms(2026, 2, 15, 18, 0, 0).unwrap();
        let cut = cutoff(now, Duration::hours(24));

        let kept = retain_upcoming(
            vec![
                record("20260214T180000Z"),
                record("20260214T175959Z"),
                record("20260214T180000"),
            ],
            cut,
        );

        assert_eq!(kept.len(), 2, "Exactly-at-cutoff starts are kept");
    }
}
