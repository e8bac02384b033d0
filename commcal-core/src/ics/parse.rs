//! Property-level ICS parsing: unfolding, escaping, content lines, datetimes.

use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::event::{ContentLine, EventTime};

fn fold_pattern() -> &'static Regex {
    static FOLD: OnceLock<Regex> = OnceLock::new();
    FOLD.get_or_init(|| Regex::new(r"\r?\n[ \t]").expect("fold pattern is valid"))
}

/// Join continuation lines (lines starting with a space or tab) onto the
/// previous line, removing the fold.
pub fn unfold(content: &str) -> String {
    fold_pattern().replace_all(content, "").into_owned()
}

/// Reverse ICS text escaping (`\n`, `\N`, `\,`, `\;`, `\\`).
pub fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(',') => out.push(','),
            Some(';') => out.push(';'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}

/// Apply ICS text escaping to a value before writing it into a block.
pub fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ',' => out.push_str("\\,"),
            ';' => out.push_str("\\;"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out
}

/// Property name of a physical line, if the line starts a property.
pub fn property_name(line: &str) -> Option<&str> {
    let end = line.find([';', ':'])?;
    let name = &line[..end];
    let valid = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    valid.then_some(name)
}

/// Parse a property block into content lines, unfolding first.
/// Lines that are not `NAME[;PARAMS]:VALUE` are skipped.
pub fn parse_content_lines(block: &str) -> Vec<ContentLine> {
    unfold(block)
        .split('\n')
        .map(|l| l.trim_end_matches('\r'))
        .filter_map(parse_content_line)
        .collect()
}

fn parse_content_line(line: &str) -> Option<ContentLine> {
    let name = property_name(line)?;
    let rest = &line[name.len()..];

    // First ':' outside a quoted parameter value ends the parameter list
    let mut in_quotes = false;
    let mut colon = None;
    for (i, c) in rest.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ':' if !in_quotes => {
                colon = Some(i);
                break;
            }
            _ => {}
        }
    }
    let colon = colon?;

    let params = rest[..colon]
        .split(';')
        .filter(|p| !p.is_empty())
        .filter_map(|p| {
            let (key, val) = p.split_once('=')?;
            Some((key.trim().to_ascii_uppercase(), val.trim_matches('"').to_string()))
        })
        .collect();

    Some(ContentLine {
        name: name.to_ascii_uppercase(),
        params,
        value: rest[colon + 1..].to_string(),
    })
}

/// Parse a DTSTART/DTEND value.
///
/// - `20260214T180000Z` → UTC
/// - `20260214T180000` → floating (or zoned when a TZID parameter is given)
/// - `20260214` → all-day
///
/// Only the text after the last `:` is considered, so values that still
/// carry a parameter prefix parse the same way.
pub fn parse_ics_datetime(value: &str, tzid: Option<&str>) -> Option<EventTime> {
    let value = value.rsplit(':').next().unwrap_or(value).trim();

    if let Some(utc) = value.strip_suffix('Z') {
        NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S")
            .ok()
            .map(|dt| EventTime::DateTimeUtc(dt.and_utc()))
    } else if value.contains('T') {
        let datetime = NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S").ok()?;
        Some(match tzid {
            Some(tz) => EventTime::DateTimeZoned {
                datetime,
                tzid: tz.to_string(),
            },
            None => EventTime::DateTimeFloating(datetime),
        })
    } else {
        NaiveDate::parse_from_str(value, "%Y%m%d")
            .ok()
            .map(EventTime::Date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_unfold_handles_crlf_lf_and_tab() {
        let folded = "DESCRIPTION:Hello \r\n world\n\tand more";
        assert_eq!(unfold(folded), "DESCRIPTION:Hello worldand more");
    }

    #[test]
    fn test_unescape_reverses_ics_escapes() {
        assert_eq!(
            unescape_text(r"Line one\nLine two\, with comma\; semi \\ slash"),
            "Line one\nLine two, with comma; semi \\ slash"
        );
        // A literal backslash followed by n stays a backslash and an n
        assert_eq!(unescape_text(r"C:\\new"), "C:\\new");
    }

    #[test]
    fn test_escape_then_unescape_is_identity() {
        let original = "Books, Music; and \\ more\nNext line";
        assert_eq!(unescape_text(&escape_text(original)), original);
    }

    #[test]
    fn test_content_line_params_and_value() {
        let lines = parse_content_lines(
            "DTSTART;TZID=America/Los_Angeles;VALUE=DATE-TIME:20260214T100000\r\n\
ATTENDEE;CN=\"Smith: Jo\":mailto:jo@example.com",
        );

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].name, "DTSTART");
        assert_eq!(lines[0].param("tzid"), Some("America/Los_Angeles"));
        assert_eq!(lines[0].value, "20260214T100000");
        assert_eq!(lines[1].param("CN"), Some("Smith: Jo"));
        assert_eq!(lines[1].value, "mailto:jo@example.com");
    }

    #[test]
    fn test_non_property_lines_are_skipped() {
        let lines = parse_content_lines("SUMMARY:Ok\r\nthis is junk without colon\r\nnot a name: value");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].name, "SUMMARY");
    }

    #[test]
    fn test_parse_ics_datetime_shapes() {
        assert_eq!(
            parse_ics_datetime("20260214T180000Z", None),
            Some(EventTime::DateTimeUtc(
                Utc.with_ymd_and_hms(2026, 2, 14, 18, 0, 0).unwrap()
            ))
        );
        assert!(matches!(
            parse_ics_datetime("20260214T180000", None),
            Some(EventTime::DateTimeFloating(_))
        ));
        assert!(matches!(
            parse_ics_datetime("20260214T180000", Some("America/New_York")),
            Some(EventTime::DateTimeZoned { .. })
        ));
        assert_eq!(
            parse_ics_datetime("20260101", None),
            Some(EventTime::Date(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()))
        );
        assert_eq!(
            parse_ics_datetime("TZID=America/Los_Angeles:20260101", None),
            Some(EventTime::Date(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()))
        );
        assert_eq!(parse_ics_datetime("soon", None), None);
        assert_eq!(parse_ics_datetime("20261301T000000Z", None), None);
    }
}
