//! ICS reading and writing.
//!
//! Only the properties the merge pipeline needs are interpreted; everything
//! else is carried through in each record's raw block.

mod extract;
mod generate;
mod parse;

pub use extract::{SourceInfo, extract_events};
pub use generate::{FeedMetadata, PRODID, generate_feed};
pub use parse::{
    escape_text, parse_content_lines, parse_ics_datetime, property_name, unescape_text, unfold,
};
