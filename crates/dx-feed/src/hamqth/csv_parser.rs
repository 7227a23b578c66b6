//! HamQTH CSV line parser.
//!
//! The feed is one spot per line, `^`-delimited:
//!
//! ```text
//! spotter^freq_khz^dx_call^comment^HHMM YYYY-MM-DD^lotw^eqsl^continent^band^country^adif
//! DB0SUE^7010.0^ZS6AJS^CW 18 dB 23 WPM CQ^2041 2013-02-08^^^AF^40M^South Africa^462
//! ```
//!
//! Only the first five fields are used. Lines with fewer fields, or whose
//! callsign / frequency / time fields do not normalize, are skipped.

use chrono::{DateTime, NaiveDateTime, Utc};
use dx_core::{Spot, SpotSource};

use crate::line_util::{clean_comment, format_hhmm, normalize_call, parse_freq_mhz};

const DELIMITER: char = '^';
const MIN_FIELDS: usize = 5;

/// Parse one CSV line into a [`Spot`].
///
/// Returns `None` for headers, blank lines, and malformed records.
pub fn parse_line(line: &str) -> Option<Spot> {
    let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split(DELIMITER).collect();
    if fields.len() < MIN_FIELDS {
        return None;
    }

    let spotter = normalize_call(fields[0])?;
    let freq_mhz = parse_freq_mhz(fields[1])?;
    let dx_call = normalize_call(fields[2])?;
    let time = format_hhmm(fields[4])?;

    Some(Spot {
        spotter,
        dx_call,
        freq_mhz,
        comment: clean_comment(fields[3]),
        time,
        source: SpotSource::HamQth,
        observed_at: parse_time_date(fields[4]),
    })
}

/// Parse a whole response body, keeping input order, at most `limit` spots.
pub fn parse_body(body: &str, limit: usize) -> Vec<Spot> {
    body.lines().filter_map(parse_line).take(limit).collect()
}

/// `"2041 2013-02-08"` → UTC timestamp. `None` when the format differs.
fn parse_time_date(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw.trim(), "%H%M %Y-%m-%d").ok().map(|t| t.and_utc())
}
