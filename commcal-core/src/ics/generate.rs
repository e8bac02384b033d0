//! Combined feed generation.
//!
//! The calendar header comes from the icalendar crate; event blocks are
//! concatenated verbatim from each record's raw block, so no field is ever
//! re-encoded.

use icalendar::{Calendar, Property};

use crate::event::EventRecord;

pub const PRODID: &str = "-//Community Calendar//Combined Feed//EN";

/// Calendar-level properties of the combined feed.
#[derive(Debug, Clone)]
pub struct FeedMetadata {
    pub calendar_name: String,
    /// ISO-8601 duration for REFRESH-INTERVAL and X-PUBLISHED-TTL, e.g. `PT1H`
    pub refresh_interval: String,
}

/// Serialize records into one VCALENDAR document with CRLF line endings.
pub fn generate_feed(records: &[EventRecord], meta: &FeedMetadata) -> String {
    let mut cal = Calendar::new();
    cal.append_property(Property::new("METHOD", "PUBLISH"));
    cal.append_property(Property::new("X-WR-CALNAME", meta.calendar_name.as_str()));

    let mut refresh = Property::new("REFRESH-INTERVAL", meta.refresh_interval.as_str());
    refresh.add_parameter("VALUE", "DURATION");
    cal.append_property(refresh);
    cal.append_property(Property::new("X-PUBLISHED-TTL", meta.refresh_interval.as_str()));

    let header = calendar_properties(&cal.done().to_string());
    let prodid = format!("PRODID:{}", PRODID);

    let mut lines: Vec<&str> = vec!["BEGIN:VCALENDAR", "VERSION:2.0", &prodid, "CALSCALE:GREGORIAN"];
    lines.extend(header.iter().map(String::as_str));

    for record in records {
        lines.push("BEGIN:VEVENT");
        lines.push(record.raw());
        lines.push("END:VEVENT");
    }
    lines.push("END:VCALENDAR");

    let mut output = lines.join("\r\n");
    output.push_str("\r\n");
    output
}

/// Calendar-level property lines from the icalendar output, minus the
/// fixed envelope (BEGIN/END, VERSION, PRODID, CALSCALE) we write ourselves.
/// Folded continuation lines stay attached to their property.
fn calendar_properties(ics: &str) -> Vec<String> {
    let mut props: Vec<String> = Vec::new();
    let mut in_component = false;

    for line in ics.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(last) = props.last_mut() {
                last.push_str("\r\n");
                last.push_str(line);
            }
            continue;
        }
        if line.starts_with("BEGIN:") && line != "BEGIN:VCALENDAR" {
            in_component = true;
            continue;
        }
        if line.starts_with("END:") && line != "END:VCALENDAR" {
            in_component = false;
            continue;
        }
        if in_component
            || line.is_empty()
            || line == "BEGIN:VCALENDAR"
            || line == "END:VCALENDAR"
            || line.starts_with("VERSION:")
            || line.starts_with("PRODID:")
            || line.starts_with("CALSCALE:")
        {
            continue;
        }
        props.push(line.to_string());
    }

    props
}
