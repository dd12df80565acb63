//! Property encoding for semantic search.
//!
//! Embeddings only see the document text, so properties are rendered into a
//! trailing section of the stored document: `content`, then [`PROPS_DELIMITER`],
//! then one `"readable key: value"` line per property. Date-like values are
//! spelled out ("Tuesday January 13 2026") so a query such as "meetings on
//! Tuesday" can land on them. [`decode`] cuts at the first delimiter and
//! recovers the original content.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::types::{is_reserved, Properties, PropertyValue};

/// Separator between content and the encoded properties. The U+2063 invisible
/// separators keep it out of anything a user would type. No prefix of it is
/// also a suffix, so it can never straddle the end of the content.
pub const PROPS_DELIMITER: &str = "\n\n\u{2063}\u{2063}properties\u{2063}\u{2063}";

const DATE_KEY_SUFFIXES: [&str; 5] = ["_date", "_at", "_time", "_due", "_deadline"];
const DATE_KEY_NAMES: [&str; 5] = ["due", "deadline", "scheduled", "start", "end"];

/// Encode `content` and `properties` into the stored document form.
///
/// Returns `content` untouched when no user properties remain after dropping
/// the reserved timestamp keys.
pub fn encode(content: &str, properties: Option<&Properties>) -> String {
    let lines: Vec<String> = properties
        .into_iter()
        .flatten()
        .filter(|(key, _)| !is_reserved(key))
        .map(|(key, value)| format!("{}: {}", readable_key(key), render_value(key, value)))
        .collect();

    if lines.is_empty() {
        return content.to_string();
    }
    format!("{content}{PROPS_DELIMITER}\n{}", lines.join("\n"))
}

/// Strip the encoded property section. Documents without a delimiter (written
/// before encoding existed) are returned whole.
pub fn decode(stored: &str) -> &str {
    match stored.split_once(PROPS_DELIMITER) {
        Some((content, _)) => content,
        None => stored,
    }
}

/// Whether `stored` already carries an encoded property section.
pub fn is_encoded(stored: &str) -> bool {
    stored.contains(PROPS_DELIMITER)
}

/// Date-like keys end in `_date`, `_at`, `_time`, `_due`, `_deadline`, or are
/// exactly one of `due`, `deadline`, `scheduled`, `start`, `end`. Case-insensitive.
pub fn is_date_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    DATE_KEY_SUFFIXES.iter().any(|suffix| key.ends_with(suffix))
        || DATE_KEY_NAMES.contains(&key.as_str())
}

/// Render an ISO-8601 date or date-time as a sentence. Anything that does not
/// parse is returned unchanged.
pub fn format_date_value(value: &str) -> String {
    const DATE_FMT: &str = "%A %B %-d %Y";
    match parse_iso(value) {
        Some(Parsed::Date(date)) => date.format(DATE_FMT).to_string(),
        Some(Parsed::DateTime(dt)) => {
            format!("{} at {}", dt.format(DATE_FMT), dt.format("%-I:%M %p"))
        }
        None => value.to_string(),
    }
}

fn readable_key(key: &str) -> String {
    key.replace('_', " ")
}

fn render_value(key: &str, value: &PropertyValue) -> String {
    match value {
        PropertyValue::Text(text) if is_date_key(key) => format_date_value(text),
        other => other.to_string(),
    }
}

enum Parsed {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

/// Parse date-only or date-time ISO-8601. Offsets are accepted and the wall
/// clock time as written is kept.
fn parse_iso(value: &str) -> Option<Parsed> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(Parsed::Date(date));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(Parsed::DateTime(dt.naive_local()));
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(value, fmt) {
            return Some(Parsed::DateTime(dt.naive_local()));
        }
    }

    let naive = value.strip_suffix('Z').unwrap_or(value);
    [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(naive, fmt).ok())
    .map(Parsed::DateTime)
}
