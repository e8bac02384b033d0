//! Event records flowing through the merge pipeline.
//!
//! A record keeps the original VEVENT property block as its canonical form.
//! The block is also parsed into [`ContentLine`]s so fields can be read
//! without re-scanning text, but every mutation goes through the raw block
//! and the parsed view is re-derived from it. Nonstandard or extension
//! properties therefore survive the round trip untouched.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::ics::{escape_text, parse_content_lines, parse_ics_datetime, property_name};

/// Start or end time of an event, as written in the source feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventTime {
    /// All-day event (`DTSTART:20260214`)
    Date(NaiveDate),
    /// UTC datetime (`DTSTART:20260214T180000Z`)
    DateTimeUtc(DateTime<Utc>),
    /// Local time with no zone information
    DateTimeFloating(NaiveDateTime),
    /// Local time qualified by a TZID parameter. The zone is kept for
    /// reference only; comparisons treat it like a floating time.
    DateTimeZoned { datetime: NaiveDateTime, tzid: String },
}

impl EventTime {
    /// Instant used for ordering and time filtering.
    /// Naive values are read as UTC and all-day values as midnight.
    pub fn sort_key(&self) -> DateTime<Utc> {
        match self {
            EventTime::Date(d) => d.and_time(NaiveTime::default()).and_utc(),
            EventTime::DateTimeUtc(dt) => *dt,
            EventTime::DateTimeFloating(dt) => dt.and_utc(),
            EventTime::DateTimeZoned { datetime, .. } => datetime.and_utc(),
        }
    }

    /// Calendar date as written in the feed (UTC date for UTC values).
    pub fn date(&self) -> NaiveDate {
        match self {
            EventTime::Date(d) => *d,
            EventTime::DateTimeUtc(dt) => dt.date_naive(),
            EventTime::DateTimeFloating(dt) => dt.date(),
            EventTime::DateTimeZoned { datetime, .. } => datetime.date(),
        }
    }

    pub fn is_all_day(&self) -> bool {
        matches!(self, EventTime::Date(_))
    }

    /// ISO-8601 local time string (`2026-02-14T10:00:00`).
    ///
    /// UTC values are converted into `tz`; local values are printed as-is.
    pub fn to_local_string(&self, tz: Tz) -> String {
        const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
        match self {
            EventTime::Date(d) => d.and_time(NaiveTime::default()).format(FORMAT).to_string(),
            EventTime::DateTimeUtc(dt) => dt.with_timezone(&tz).format(FORMAT).to_string(),
            EventTime::DateTimeFloating(dt) => dt.format(FORMAT).to_string(),
            EventTime::DateTimeZoned { datetime, .. } => datetime.format(FORMAT).to_string(),
        }
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EventTime::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            EventTime::DateTimeUtc(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M UTC")),
            EventTime::DateTimeFloating(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M")),
            EventTime::DateTimeZoned { datetime, tzid } => {
                write!(f, "{} ({})", datetime.format("%Y-%m-%d %H:%M"), tzid)
            }
        }
    }
}

/// One unfolded property line: `NAME;PARAM=VAL:value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLine {
    /// Upper-cased property name
    pub name: String,
    pub params: Vec<(String, String)>,
    /// Value exactly as written (still escaped)
    pub value: String,
}

impl ContentLine {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Unescaped, trimmed text value.
    pub fn text(&self) -> String {
        crate::ics::unescape_text(&self.value).trim().to_string()
    }
}

/// A single VEVENT with a parseable start time.
#[derive(Debug, Clone)]
pub struct EventRecord {
    start: EventTime,
    raw: String,
    lines: Vec<ContentLine>,
}

impl EventRecord {
    /// Build a record from the property block between `BEGIN:VEVENT` and
    /// `END:VEVENT`. Returns `None` when DTSTART is missing or unparseable.
    pub fn from_block(block: &str) -> Option<Self> {
        let raw = normalize_line_endings(block);
        let lines = parse_content_lines(&raw);
        let start = start_from_lines(&lines)?;

        Some(EventRecord { start, raw, lines })
    }

    pub fn start(&self) -> &EventTime {
        &self.start
    }

    /// DTEND if present and parseable, otherwise the start.
    pub fn end(&self) -> EventTime {
        self.lines
            .iter()
            .find(|l| l.name == "DTEND")
            .and_then(|l| parse_ics_datetime(&l.value, l.param("TZID")))
            .unwrap_or_else(|| self.start.clone())
    }

    /// The raw property block, CRLF-separated, without BEGIN/END lines.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn lines(&self) -> &[ContentLine] {
        &self.lines
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.lines.iter().any(|l| l.name.eq_ignore_ascii_case(name))
    }

    /// First value of a property, unescaped. Empty values read as `None`.
    pub fn field(&self, name: &str) -> Option<String> {
        self.lines
            .iter()
            .find(|l| l.name.eq_ignore_ascii_case(name))
            .map(ContentLine::text)
            .filter(|v| !v.is_empty())
    }

    /// SUMMARY, or an empty string.
    pub fn title(&self) -> String {
        self.field("SUMMARY").unwrap_or_default()
    }

    pub fn location(&self) -> Option<String> {
        self.field("LOCATION")
    }

    pub fn description(&self) -> Option<String> {
        self.field("DESCRIPTION")
    }

    pub fn url(&self) -> Option<String> {
        self.field("URL")
    }

    pub fn uid(&self) -> Option<String> {
        self.field("UID")
    }

    pub fn source(&self) -> Option<String> {
        self.field("X-SOURCE")
    }

    pub fn source_id(&self) -> Option<String> {
        self.field("X-SOURCE-ID")
    }

    /// First value of a property exactly as written, without unescaping.
    pub fn raw_field(&self, name: &str) -> Option<&str> {
        self.lines
            .iter()
            .find(|l| l.name.eq_ignore_ascii_case(name))
            .map(|l| l.value.trim())
            .filter(|v| !v.is_empty())
    }

    /// Per-source URLs recorded in `X-SOURCE-URLS`. Malformed JSON reads as empty.
    ///
    /// The value is JSON as written; feeds that TEXT-escaped it are accepted too.
    pub fn source_urls(&self) -> BTreeMap<String, String> {
        let Some(raw) = self.raw_field("X-SOURCE-URLS") else {
            return BTreeMap::new();
        };
        serde_json::from_str(raw)
            .or_else(|_| serde_json::from_str(&crate::ics::unescape_text(raw)))
            .unwrap_or_default()
    }

    /// Insert a TEXT property at the top of the block, escaping the value.
    pub fn prepend_property(&mut self, name: &str, value: &str) {
        self.prepend_raw_property(name, &escape_text(value));
    }

    /// Insert a property whose value is written verbatim (URIs, JSON, ids).
    pub fn prepend_raw_property(&mut self, name: &str, value: &str) {
        self.raw = format!("{}:{}\r\n{}", name, value, self.raw);
        self.reparse();
    }

    /// Replace the first occurrence of a TEXT property (including its folded
    /// continuation lines), or prepend it if absent.
    pub fn set_property(&mut self, name: &str, value: &str) {
        self.set_raw_property(name, &escape_text(value));
    }

    /// Like [`set_property`](Self::set_property), but writes `value` verbatim.
    pub fn set_raw_property(&mut self, name: &str, value: &str) {
        let new_line = format!("{}:{}", name, value);
        let mut out: Vec<&str> = Vec::new();
        let mut replaced = false;
        let mut skipping_fold = false;

        for line in self.raw.split("\r\n") {
            if skipping_fold {
                if line.starts_with(' ') || line.starts_with('\t') {
                    continue;
                }
                skipping_fold = false;
            }
            if !replaced && property_name(line).is_some_and(|n| n.eq_ignore_ascii_case(name)) {
                out.push(&new_line);
                replaced = true;
                skipping_fold = true;
                continue;
            }
            out.push(line);
        }

        if replaced {
            self.raw = out.join("\r\n");
            self.reparse();
        } else {
            self.prepend_raw_property(name, value);
        }
    }

    fn reparse(&mut self) {
        self.lines = parse_content_lines(&self.raw);
    }
}

fn start_from_lines(lines: &[ContentLine]) -> Option<EventTime> {
    let line = lines.iter().find(|l| l.name == "DTSTART")?;
    parse_ics_datetime(&line.value, line.param("TZID"))
}

/// CRLF everywhere, no trailing blank lines.
fn normalize_line_endings(block: &str) -> String {
    block
        .replace("\r\n", "\n")
        .split('\n')
        .map(|l| l.trim_end_matches('\r'))
        .collect::<Vec<_>>()
        .join("\r\n")
        .trim_end_matches(['\r', '\n'])
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const BLOCK: &str = "UID:abc-1\r\n\
SUMMARY:Open Mic\\, Poetry Night\r\n\
DTSTART;TZID=America/Los_Angeles:20260214T190000\r\n\
DTEND;TZID=America/Los_Angeles:20260214T210000\r\n\
LOCATION:Redwood Cafe\\, 8240 Old Redwood\r\n  Hwy\\, Cotati\r\n\
X-SOURCE-ID:redwood_cafe";

    #[test]
    fn test_record_reads_fields_with_unescaping_and_unfolding() {
        let record = EventRecord::from_block(BLOCK).expect("Should parse");

        assert_eq!(record.title(), "Open Mic, Poetry Night");
        assert_eq!(
            record.location().as_deref(),
            Some("Redwood Cafe, 8240 Old Redwood Hwy, Cotati")
        );
        assert_eq!(record.uid().as_deref(), Some("abc-1"));
        // X-SOURCE must not match X-SOURCE-ID
        assert_eq!(record.source(), None);
        assert_eq!(record.source_id().as_deref(), Some("redwood_cafe"));
    }

    #[test]
    fn test_record_zoned_start_compares_as_naive_utc() {
        let record = EventRecord::from_block(BLOCK).expect("Should parse");

        match record.start() {
            EventTime::DateTimeZoned { tzid, .. } => assert_eq!(tzid, "America/Los_Angeles"),
            other => panic!("Expected DateTimeZoned, got {:?}", other),
        }
        assert_eq!(
            record.start().sort_key(),
            Utc.with_ymd_and_hms(2026, 2, 14, 19, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_record_without_dtstart_is_rejected() {
        assert!(EventRecord::from_block("UID:x\r\nSUMMARY:No time").is_none());
        assert!(EventRecord::from_block("DTSTART:not-a-date\r\nSUMMARY:Bad").is_none());
    }

    #[test]
    fn test_end_defaults_to_start() {
        let record = EventRecord::from_block("DTSTART:20260301\r\nSUMMARY:Fair").unwrap();
        assert_eq!(record.end(), *record.start());
        assert!(record.start().is_all_day());
    }

    #[test]
    fn test_set_property_replaces_folded_line() {
        let mut record = EventRecord::from_block(BLOCK).unwrap();
        record.set_property("LOCATION", "Somewhere Else");

        assert_eq!(record.location().as_deref(), Some("Somewhere Else"));
        assert!(
            !record.raw().contains("Hwy"),
            "Continuation line should be removed. Raw:\n{}",
            record.raw()
        );
        assert_eq!(record.title(), "Open Mic, Poetry Night");
    }

    #[test]
    fn test_prepend_property_escapes_value() {
        let mut record = EventRecord::from_block(BLOCK).unwrap();
        record.prepend_property("X-SOURCE", "Books, Music; More");

        assert!(record.raw().starts_with("X-SOURCE:Books\\, Music\\; More\r\n"));
        assert_eq!(record.source().as_deref(), Some("Books, Music; More"));
    }

    #[test]
    fn test_raw_property_is_not_escaped() {
        let mut record = EventRecord::from_block(BLOCK).unwrap();
        record.prepend_raw_property("URL", "https://v.example.com/cal?ids=1,2;x");
        record.set_raw_property("X-SOURCE-URLS", r#"{"A":"https://a.example.com/?q=1,2"}"#);

        assert!(
            record.raw().starts_with(
                "X-SOURCE-URLS:{\"A\":\"https://a.example.com/?q=1,2\"}\r\nURL:https://v.example.com/cal?ids=1,2;x\r\n"
            ),
            "Raw values should be written verbatim. Raw:\n{}",
            record.raw()
        );
        assert_eq!(record.url().as_deref(), Some("https://v.example.com/cal?ids=1,2;x"));
        assert_eq!(
            record.source_urls().get("A").map(String::as_str),
            Some("https://a.example.com/?q=1,2")
        );
    }

    #[test]
    fn test_source_urls_accepts_escaped_json() {
        let record = EventRecord::from_block(
            "DTSTART:20260301\r\nX-SOURCE-URLS:{\"A\":\"https://a.example.com\"\\,\"B\":\"https://b.example.com\"}",
        )
        .unwrap();

        let urls = record.source_urls();
        assert_eq!(urls.len(), 2);
        assert_eq!(urls.get("B").map(String::as_str), Some("https://b.example.com"));
    }

    #[test]
    fn test_to_local_string_converts_utc_only() {
        let utc = EventTime::DateTimeUtc(Utc.with_ymd_and_hms(2026, 2, 14, 18, 0, 0).unwrap());
        assert_eq!(
            utc.to_local_string(chrono_tz::America::Los_Angeles),
            "2026-02-14T10:00:00"
        );

        let date = EventTime::Date(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        assert_eq!(
            date.to_local_string(chrono_tz::America::Los_Angeles),
            "2026-01-01T00:00:00"
        );
    }
}
