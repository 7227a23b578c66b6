//! DXSpider spot line parser.
//!
//! Two grammars reach a session:
//!
//! - broadcast: `DX de SP5XYZ:     14074.0  K1ABC        FT8 -12 dB          1423Z`
//!   (optionally followed by a locator after the time)
//! - `sh/dx` listing: `  14074.0  K1ABC       5-Jan-2024 1423Z  FT8 -12dB   <SP5XYZ>`
//!
//! Both normalize into the same [`Spot`]. Anything else (banners, prompts,
//! command echoes) yields `None` and is skipped by the session.

use chrono::{DateTime, NaiveDateTime, Utc};
use dx_core::{Spot, SpotSource};

use crate::line_util::{clean_comment, format_hhmm, is_zulu_token, normalize_call, parse_freq_mhz};

/// Parse one line in either grammar.
pub fn parse_line(line: &str) -> Option<Spot> {
    let trimmed = line.trim();
    match trimmed.get(..6) {
        Some(head) if head.eq_ignore_ascii_case("DX de ") => parse_broadcast(&trimmed[6..]),
        _ => parse_listing(trimmed),
    }
}

/// `SPOTTER: FREQ DXCALL comment... HHMMZ [locator]`
fn parse_broadcast(rest: &str) -> Option<Spot> {
    // The spotter and frequency can run together when the call is long:
    // `DL8LAS-#:7005.0`.
    let (spotter_raw, after) = rest.split_once(':')?;
    let spotter = normalize_call(spotter_raw)?;

    let tokens: Vec<&str> = after.split_whitespace().collect();
    let [freq_raw, dx_raw, tail @ ..] = tokens.as_slice() else {
        return None;
    };
    let freq_mhz = parse_freq_mhz(freq_raw)?;
    let dx_call = normalize_call(dx_raw)?;

    let time_idx = tail.iter().rposition(|t| is_zulu_token(t))?;
    let time = format_hhmm(tail[time_idx])?;

    Some(Spot {
        spotter,
        dx_call,
        freq_mhz,
        comment: clean_comment(&tail[..time_idx].join(" ")),
        time,
        source: SpotSource::DxSpider,
        observed_at: None,
    })
}

/// `FREQ DXCALL D-Mon-YYYY HHMMZ comment... <SPOTTER>`
fn parse_listing(line: &str) -> Option<Spot> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let [freq_raw, dx_raw, date_raw, time_raw, middle @ .., spotter_raw] = tokens.as_slice() else {
        return None;
    };
    if !is_zulu_token(time_raw) {
        return None;
    }
    let spotter = normalize_call(spotter_raw.strip_prefix('<')?.strip_suffix('>')?)?;
    let freq_mhz = parse_freq_mhz(freq_raw)?;
    let dx_call = normalize_call(dx_raw)?;
    let time = format_hhmm(time_raw)?;

    Some(Spot {
        spotter,
        dx_call,
        freq_mhz,
        comment: clean_comment(&middle.join(" ")),
        time,
        source: SpotSource::DxSpider,
        observed_at: parse_listing_date(date_raw, time_raw),
    })
}

/// `"5-Jan-2024"` + `"1423Z"` → UTC timestamp.
fn parse_listing_date(date: &str, time: &str) -> Option<DateTime<Utc>> {
    let stamp = format!("{date} {}", &time[..4]);
    NaiveDateTime::parse_from_str(&stamp, "%d-%b-%Y %H%M").ok().map(|t| t.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_line() {
        let spot =
            parse_line("DX de SP5XYZ:     14074.0  K1ABC        FT8 -12 dB from FN42           1423Z").unwrap();
        assert_eq!(spot.spotter, "SP5XYZ");
        assert_eq!(spot.dx_call, "K1ABC");
        assert_eq!(spot.freq_mhz, "14.074");
        assert_eq!(spot.comment, "FT8 -12 dB from FN42");
        assert_eq!(spot.time, "14:23z");
        assert_eq!(spot.source, SpotSource::DxSpider);
    }

    #[test]
    fn broadcast_with_locator_and_glued_frequency() {
        let spot = parse_line("DX de DL8LAS-#:7005.0  ua9xyz  CW 22 dB 25 WPM CQ  0815Z JO62").unwrap();
        assert_eq!(spot.spotter, "DL8LAS-#");
        assert_eq!(spot.dx_call, "UA9XYZ");
        assert_eq!(spot.freq_mhz, "7.005");
        assert_eq!(spot.time, "08:15z");
        assert_eq!(spot.comment, "CW 22 dB 25 WPM CQ");
    }

    #[test]
    fn broadcast_lowercase_prefix() {
        assert!(parse_line("dx de G4ABC: 3525.0 EA8XX cq 2301Z").is_some());
    }

    #[test]
    fn listing_line() {
        let spot = parse_line("  14074.0  K1ABC       5-Jan-2024 1423Z  FT8 -12dB             <SP5XYZ>").unwrap();
        assert_eq!(spot.spotter, "SP5XYZ");
        assert_eq!(spot.dx_call, "K1ABC");
        assert_eq!(spot.freq_mhz, "14.074");
        assert_eq!(spot.comment, "FT8 -12dB");
        assert_eq!(spot.time, "14:23z");
        assert!(spot.observed_at.is_some());
    }

    #[test]
    fn listing_without_comment() {
        let spot = parse_line("   7010.0  JA1ABC     12-Mar-2024 0001Z  <W1AW>").unwrap();
        assert_eq!(spot.comment, "");
        assert_eq!(spot.spotter, "W1AW");
    }

    #[test]
    fn non_spot_lines_are_skipped() {
        assert!(parse_line("").is_none());
        assert!(parse_line("login: ").is_none());
        assert!(parse_line("Hello Fred, this is GB7DJK in Reading").is_none());
        assert!(parse_line("N0CALL de GB7DJK  5-Jan-2024 1423Z dxspider >").is_none());
        assert!(parse_line("DX de SP5XYZ: 14074.0 K1ABC no time here").is_none());
        assert!(parse_line("sh/dx 25").is_none());
    }

    #[test]
    fn parse_is_idempotent() {
        let line = "DX de SP5XYZ: 14074.0 K1ABC FT8 1423Z";
        assert_eq!(parse_line(line), parse_line(line));
    }
}
