use chrono::{NaiveDate, NaiveDateTime};
use tracing::warn;

pub const CANONICAL_FORMAT: &str = "%Y-%m-%d";

/// Formats recognized on input, in trial order. Day-first comes before
/// month-first, so an ambiguous date such as `03/04/2024` reads as 3 April.
const KNOWN_FORMATS: [&str; 7] = [
    "%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y%m%d", "%d-%m-%Y", "%m-%d-%Y", "%Y/%m/%d",
];

/// How the database renders DATETIME and TIMESTAMP values as text. Only tried
/// once every date-only format has failed; the time of day is dropped.
const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Rewrite `raw` as `YYYY-MM-DD` using the first format that parses it.
///
/// Absent and empty inputs come back unchanged. An input no format accepts
/// also comes back unchanged, with a warning logged.
pub(crate) fn normalize(raw: Option<&str>) -> Option<String> {
    let raw = raw?;
    if raw.is_empty() {
        return Some(String::new());
    }
    let parsed = KNOWN_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            TIMESTAMP_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|stamp| stamp.date())
        });
    match parsed {
        Some(date) => Some(date.format(CANONICAL_FORMAT).to_string()),
        None => {
            warn!(date = raw, "unable to parse date, leaving it unchanged");
            Some(raw.to_owned())
        }
    }
}
