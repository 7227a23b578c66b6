//! Callsign-prefix → approximate coordinates.
//!
//! A deterministic, offline estimate: the callsign is reduced to its base
//! (portable indicators dropped, `PFX/CALL` resolved to the shorter segment),
//! then matched against a static prefix table by longest prefix. Plain US and
//! Canadian prefixes are refined by the call-area digit.
//!
//! Accuracy is "which country / region", which is all the path map needs.

use ahash::AHashMap;

use crate::LatLon;

/// Suffixes that say *how* a station operates, not *where*.
const OPERATING_SUFFIXES: &[&str] = &["P", "M", "MM", "AM", "QRP", "A", "B", "LH", "R"];

/// Longest prefix considered during matching.
const MAX_PREFIX_LEN: usize = 4;

/// Prefix, latitude, longitude.
#[rustfmt::skip]
const PREFIX_TABLE: &[(&str, f64, f64)] = &[
    // North America
    ("K", 39.8, -98.6), ("W", 39.8, -98.6), ("N", 39.8, -98.6),
    ("AA", 39.8, -98.6), ("AB", 39.8, -98.6), ("AC", 39.8, -98.6), ("AD", 39.8, -98.6),
    ("AE", 39.8, -98.6), ("AF", 39.8, -98.6), ("AG", 39.8, -98.6), ("AI", 39.8, -98.6),
    ("AJ", 39.8, -98.6), ("AK", 39.8, -98.6),
    ("KL7", 61.2, -149.9), ("AL7", 61.2, -149.9), ("NL7", 61.2, -149.9), ("WL7", 61.2, -149.9),
    ("KH6", 21.3, -157.8), ("AH6", 21.3, -157.8), ("NH6", 21.3, -157.8), ("WH6", 21.3, -157.8),
    ("KH2", 13.4, 144.8), ("KP4", 18.4, -66.1), ("NP4", 18.4, -66.1), ("WP4", 18.4, -66.1),
    ("KP2", 17.7, -64.8),
    ("VE", 56.1, -106.3), ("VA", 56.1, -106.3),
    ("VE1", 44.6, -63.6), ("VE2", 46.8, -71.2), ("VE3", 43.7, -79.4), ("VE4", 49.9, -97.1),
    ("VE5", 52.1, -106.6), ("VE6", 53.5, -113.5), ("VE7", 49.3, -123.1), ("VE8", 62.5, -114.4),
    ("VE9", 45.9, -66.6), ("VA2", 46.8, -71.2), ("VA3", 43.7, -79.4), ("VA6", 53.5, -113.5),
    ("VA7", 49.3, -123.1), ("VO1", 47.6, -52.7), ("VO2", 53.3, -60.4), ("VY1", 60.7, -135.1),
    ("VY2", 46.2, -63.1),
    ("XE", 19.4, -99.1), ("XF", 19.4, -99.1),
    ("TI", 9.9, -84.1), ("HP", 9.0, -79.5), ("YN", 12.1, -86.3), ("HR", 14.1, -87.2),
    ("TG", 14.6, -90.5), ("YS", 13.7, -89.2), ("V3", 17.3, -88.8),
    // Caribbean
    ("CO", 23.1, -82.4), ("CM", 23.1, -82.4), ("HI", 18.5, -69.9), ("HH", 18.5, -72.3),
    ("6Y", 18.0, -76.8), ("C6", 25.1, -77.3), ("FG", 16.2, -61.5), ("FM", 14.6, -61.0),
    ("J3", 12.1, -61.7), ("J6", 13.9, -61.0), ("J7", 15.3, -61.4), ("J8", 13.2, -61.2),
    ("8P", 13.1, -59.6), ("9Y", 10.7, -61.5), ("PJ2", 12.2, -69.0), ("PJ4", 12.2, -68.3),
    ("P4", 12.5, -70.0), ("ZF", 19.3, -81.4), ("VP9", 32.3, -64.8),
    // South America
    ("PY", -15.8, -47.9), ("PP", -15.8, -47.9), ("PU", -15.8, -47.9), ("PT", -15.8, -47.9),
    ("LU", -34.6, -58.4), ("L2", -34.6, -58.4), ("CE", -33.4, -70.6), ("CA", -33.4, -70.6),
    ("CX", -34.9, -56.2), ("ZP", -25.3, -57.6), ("CP", -16.5, -68.1), ("OA", -12.0, -77.0),
    ("HC", -0.2, -78.5), ("HK", 4.7, -74.1), ("YV", 10.5, -66.9), ("8R", 6.8, -58.2),
    ("PZ", 5.9, -55.2), ("FY", 4.9, -52.3), ("VP8", -51.7, -57.9), ("CE0Y", -27.1, -109.4),
    // Europe
    ("G", 52.5, -1.5), ("M", 52.5, -1.5), ("2E", 52.5, -1.5), ("GW", 52.1, -3.6), ("MW", 52.1, -3.6),
    ("GM", 56.5, -4.2), ("MM", 56.5, -4.2), ("GI", 54.6, -6.7), ("MI", 54.6, -6.7),
    ("GD", 54.2, -4.5), ("GJ", 49.2, -2.1), ("GU", 49.5, -2.6),
    ("EI", 53.3, -6.3), ("F", 46.6, 2.2), ("ON", 50.8, 4.4), ("PA", 52.1, 5.3), ("PD", 52.1, 5.3),
    ("PE", 52.1, 5.3), ("PH", 52.1, 5.3), ("LX", 49.6, 6.1),
    ("DL", 51.2, 10.4), ("DA", 51.2, 10.4), ("DB", 51.2, 10.4), ("DC", 51.2, 10.4), ("DD", 51.2, 10.4),
    ("DF", 51.2, 10.4), ("DG", 51.2, 10.4), ("DH", 51.2, 10.4), ("DJ", 51.2, 10.4), ("DK", 51.2, 10.4),
    ("DM", 51.2, 10.4), ("DO", 51.2, 10.4), ("DP", 51.2, 10.4), ("DQ", 51.2, 10.4), ("DR", 51.2, 10.4),
    ("HB", 46.8, 8.2), ("HB0", 47.1, 9.5), ("OE", 47.5, 14.6), ("OK", 49.8, 15.5), ("OL", 49.8, 15.5),
    ("OM", 48.7, 19.7), ("SP", 52.0, 19.1), ("SQ", 52.0, 19.1), ("SO", 52.0, 19.1), ("SN", 52.0, 19.1),
    ("HA", 47.2, 19.5), ("HG", 47.2, 19.5), ("YO", 45.9, 25.0), ("LZ", 42.7, 25.5),
    ("YU", 44.0, 20.9), ("9A", 45.1, 15.2), ("S5", 46.1, 14.8), ("E7", 43.9, 17.7), ("Z3", 41.6, 21.7),
    ("4O", 42.7, 19.4), ("ZA", 41.2, 20.2), ("SV", 39.1, 21.8), ("SX", 39.1, 21.8), ("SV9", 35.2, 24.9),
    ("I", 42.8, 12.6), ("IS", 40.1, 9.0), ("IT9", 37.6, 14.0), ("T7", 43.9, 12.4), ("HV", 41.9, 12.5),
    ("9H", 35.9, 14.4), ("EA", 40.4, -3.7), ("EB", 40.4, -3.7), ("EC", 40.4, -3.7), ("EA6", 39.6, 2.9),
    ("EA8", 28.3, -16.5), ("EA9", 35.9, -5.3), ("CT", 39.4, -8.2), ("CU", 38.7, -27.2), ("CT3", 32.7, -16.9),
    ("C3", 42.5, 1.5), ("3A", 43.7, 7.4), ("OZ", 56.0, 10.0), ("OX", 64.2, -51.7), ("OY", 62.0, -6.8),
    ("LA", 60.5, 8.5), ("LB", 60.5, 8.5), ("JW", 78.2, 15.6), ("JX", 71.0, -8.3), ("SM", 60.1, 18.6),
    ("SA", 60.1, 18.6), ("SE", 60.1, 18.6), ("SF", 60.1, 18.6), ("SK", 60.1, 18.6), ("7S", 60.1, 18.6),
    ("8S", 60.1, 18.6), ("OH", 61.9, 25.7), ("OG", 61.9, 25.7), ("OF", 61.9, 25.7), ("OH0", 60.2, 20.0),
    ("TF", 64.9, -19.0), ("ES", 58.6, 25.0), ("YL", 56.9, 24.6), ("LY", 55.2, 23.9), ("EW", 53.7, 27.9),
    ("UR", 48.4, 31.2), ("UT", 48.4, 31.2), ("UX", 48.4, 31.2), ("US", 48.4, 31.2), ("UY", 48.4, 31.2),
    ("EM", 48.4, 31.2), ("EO", 48.4, 31.2), ("ER", 47.0, 28.9),
    ("R", 55.8, 37.6), ("UA", 55.8, 37.6), ("UA2", 54.7, 20.5), ("R2F", 54.7, 20.5),
    ("UA9", 55.0, 73.4), ("RA9", 55.0, 73.4), ("R9", 55.0, 73.4), ("RK9", 55.0, 73.4), ("RV9", 55.0, 73.4),
    ("UA0", 52.0, 113.5), ("RA0", 52.0, 113.5), ("R0", 52.0, 113.5), ("RK0", 52.0, 113.5),
    // Asia
    ("JA", 36.2, 138.3), ("JE", 36.2, 138.3), ("JF", 36.2, 138.3), ("JG", 36.2, 138.3), ("JH", 36.2, 138.3),
    ("JI", 36.2, 138.3), ("JJ", 36.2, 138.3), ("JK", 36.2, 138.3), ("JL", 36.2, 138.3), ("JM", 36.2, 138.3),
    ("JN", 36.2, 138.3), ("JO", 36.2, 138.3), ("JP", 36.2, 138.3), ("JQ", 36.2, 138.3), ("JR", 36.2, 138.3),
    ("JS", 36.2, 138.3), ("7J", 36.2, 138.3), ("7K", 36.2, 138.3), ("7L", 36.2, 138.3), ("7M", 36.2, 138.3),
    ("7N", 36.2, 138.3), ("JD1", 27.1, 142.2),
    ("HL", 37.6, 127.0), ("DS", 37.6, 127.0), ("6K", 37.6, 127.0), ("P5", 39.0, 125.8),
    ("B", 35.9, 104.2), ("BY", 39.9, 116.4), ("BG", 35.9, 104.2), ("BH", 35.9, 104.2), ("BD", 35.9, 104.2),
    ("BV", 25.0, 121.5), ("BU", 25.0, 121.5), ("BX", 25.0, 121.5), ("VR", 22.3, 114.2), ("XX9", 22.2, 113.5),
    ("JT", 47.9, 106.9), ("DU", 14.6, 121.0), ("DV", 14.6, 121.0), ("DX", 14.6, 121.0), ("4F", 14.6, 121.0),
    ("HS", 13.8, 100.5), ("E2", 13.8, 100.5), ("XV", 21.0, 105.8), ("3W", 21.0, 105.8), ("XU", 11.6, 104.9),
    ("XW", 18.0, 102.6), ("XZ", 16.9, 96.2), ("9M2", 3.1, 101.7), ("9M6", 5.9, 116.1), ("9M8", 1.6, 110.3),
    ("9V", 1.35, 103.8), ("YB", -6.2, 106.8), ("YC", -6.2, 106.8), ("YD", -6.2, 106.8), ("YE", -6.2, 106.8),
    ("YF", -6.2, 106.8), ("YG", -6.2, 106.8), ("YH", -6.2, 106.8), ("V8", 4.9, 114.9), ("4W", -8.6, 125.6),
    ("VU", 20.6, 79.0), ("AT", 20.6, 79.0), ("VU4", 11.7, 92.7), ("VU7", 10.6, 72.6), ("4S", 6.9, 79.9),
    ("8Q", 4.2, 73.5), ("AP", 30.4, 69.3), ("S2", 23.7, 90.4), ("9N", 27.7, 85.3), ("A5", 27.5, 90.4),
    ("EX", 42.9, 74.6), ("EY", 38.6, 68.8), ("EZ", 37.9, 58.4), ("UK", 41.3, 69.2), ("UN", 48.0, 66.9),
    ("4L", 41.7, 44.8), ("EK", 40.2, 44.5), ("4J", 40.4, 49.9), ("4K", 40.4, 49.9), ("TA", 39.9, 32.9),
    ("TC", 39.9, 32.9), ("YM", 39.9, 32.9), ("5B", 35.1, 33.4), ("C4", 35.1, 33.4), ("H2", 35.1, 33.4),
    ("4X", 31.8, 35.2), ("4Z", 31.8, 35.2), ("E4", 31.9, 35.2), ("JY", 31.9, 35.9), ("OD", 33.9, 35.5),
    ("YK", 33.5, 36.3), ("YI", 33.3, 44.4), ("EP", 35.7, 51.4), ("EQ", 35.7, 51.4), ("HZ", 24.7, 46.7),
    ("7Z", 24.7, 46.7), ("8Z", 24.7, 46.7), ("A4", 23.6, 58.5), ("A6", 24.5, 54.4), ("A7", 25.3, 51.5),
    ("A9", 26.2, 50.6), ("9K", 29.4, 48.0), ("7O", 15.4, 44.2), ("YA", 34.5, 69.2), ("T6", 34.5, 69.2),
    // Oceania
    ("VK", -25.3, 133.8), ("AX", -25.3, 133.8), ("VK2", -33.9, 151.2), ("VK3", -37.8, 145.0),
    ("VK4", -27.5, 153.0), ("VK5", -34.9, 138.6), ("VK6", -31.9, 115.9), ("VK7", -42.9, 147.3),
    ("VK8", -12.5, 130.8), ("VK9", -29.0, 168.0), ("ZL", -41.3, 174.8), ("ZM", -41.3, 174.8),
    ("ZL7", -43.9, -176.5), ("ZL9", -50.7, 166.1), ("P2", -9.4, 147.2), ("H4", -9.4, 160.0),
    ("YJ", -17.7, 168.3), ("FK", -22.3, 166.5), ("3D2", -18.1, 178.4), ("5W", -13.8, -171.8),
    ("A3", -21.1, -175.2), ("E5", -21.2, -159.8), ("FO", -17.5, -149.6), ("KH8", -14.3, -170.7),
    ("T2", -8.5, 179.2), ("T3", 1.9, -157.5), ("V7", 7.1, 171.4), ("V6", 6.9, 158.2), ("T8", 7.5, 134.6),
    ("C2", -0.5, 166.9), ("KH0", 15.2, 145.7), ("VP6", -25.1, -130.1),
    // Africa
    ("ZS", -30.6, 22.9), ("ZR", -30.6, 22.9), ("ZT", -30.6, 22.9), ("ZU", -30.6, 22.9), ("V5", -22.6, 17.1),
    ("A2", -24.7, 25.9), ("7P", -29.3, 27.5), ("3DA", -26.3, 31.1), ("Z2", -17.8, 31.0), ("9J", -15.4, 28.3),
    ("7Q", -13.9, 33.8), ("C9", -25.9, 32.6), ("5R", -18.9, 47.5), ("3B8", -20.2, 57.5), ("FR", -21.1, 55.5),
    ("S7", -4.6, 55.5), ("D6", -11.7, 43.3), ("5H", -6.8, 39.3), ("5Z", -1.3, 36.8), ("5X", 0.3, 32.6),
    ("9X", -1.9, 30.1), ("9U", -3.4, 29.4), ("9Q", -4.3, 15.3), ("TN", -4.3, 15.3), ("TR", 0.4, 9.5),
    ("TJ", 3.9, 11.5), ("TL", 4.4, 18.6), ("TT", 12.1, 15.0), ("5N", 9.1, 7.4), ("TY", 6.4, 2.4),
    ("5V", 6.1, 1.2), ("9G", 5.6, -0.2), ("TU", 5.3, -4.0), ("EL", 6.3, -10.8), ("9L", 8.5, -13.2),
    ("3X", 9.5, -13.7), ("J5", 11.9, -15.6), ("6W", 14.7, -17.5), ("C5", 13.5, -16.6), ("D4", 14.9, -23.5),
    ("5T", 18.1, -15.9), ("TZ", 12.6, -8.0), ("XT", 12.4, -1.5), ("5U", 13.5, 2.1), ("ST", 15.5, 32.5),
    ("ET", 9.0, 38.7), ("E3", 15.3, 38.9), ("J2", 11.6, 43.1), ("6O", 2.0, 45.3), ("SU", 30.0, 31.2),
    ("5A", 32.9, 13.2), ("3V", 36.8, 10.2), ("7X", 36.8, 3.1), ("CN", 34.0, -6.8), ("S0", 27.2, -13.2),
    ("D2", -8.8, 13.2), ("S9", 0.3, 6.7), ("3C", 3.8, 8.8), ("ZD7", -15.9, -5.7), ("ZD8", -7.9, -14.4),
    ("ZD9", -37.1, -12.3),
    // Antarctica
    ("KC4", -77.8, 166.7), ("VP8O", -60.7, -45.6), ("CE9", -62.2, -58.9),
];

/// US call-area digit → region centroid.
const US_CALL_AREAS: [(f64, f64); 10] = [
    (41.5, -100.0), // 0: CO KS MN MO NE ND SD IA
    (42.5, -71.8),  // 1: New England
    (41.5, -74.5),  // 2: NY NJ
    (40.0, -77.5),  // 3: PA MD DE DC
    (33.5, -84.0),  // 4: South-east
    (32.5, -97.0),  // 5: TX OK LA AR MS NM
    (36.5, -119.5), // 6: CA
    (43.0, -114.0), // 7: North-west and mountain
    (40.5, -83.0),  // 8: MI OH WV
    (41.5, -88.0),  // 9: IL IN WI
];

/// Offline callsign → coordinate estimator.
#[derive(Debug, Clone)]
pub struct GeoEstimator {
    table: AHashMap<&'static str, LatLon>,
}

impl GeoEstimator {
    pub fn new() -> Self {
        let table = PREFIX_TABLE.iter().map(|&(p, lat, lon)| (p, LatLon::new(lat, lon))).collect();
        Self { table }
    }

    /// Estimate the location of `call`, or `None` if no prefix matches.
    pub fn locate(&self, call: &str) -> Option<LatLon> {
        let (base, portable_area) = base_prefix_source(call)?;

        let max = base.len().min(MAX_PREFIX_LEN);
        let (prefix, loc) = (1..=max).rev().find_map(|n| {
            let p = base.get(..n)?;
            self.table.get(p).map(|loc| (p, *loc))
        })?;

        if is_plain_us_prefix(prefix) {
            if let Some(area) = portable_area.or_else(|| call_area_digit(&base)) {
                let (lat, lon) = US_CALL_AREAS[area];
                return Some(LatLon::new(lat, lon));
            }
        }
        Some(loc)
    }
}

impl Default for GeoEstimator {
    fn default() -> Self {
        Self::new()
    }
}

/// Reduce a raw callsign to the segment that carries the location prefix.
///
/// `dl/k1abc/p` → `DL`, `K1ABC/VE3` → `VE3`, `G4XYZ/M` → `G4XYZ`.
///
/// A lone digit segment (`W1AW/4`) is returned separately as the call area
/// the station is operating from.
fn base_prefix_source(call: &str) -> Option<(String, Option<usize>)> {
    let upper = call.trim().to_ascii_uppercase();
    let mut portable_area = None;
    let mut segments: Vec<&str> = Vec::new();
    for s in upper.split('/').filter(|s| !s.is_empty()) {
        match s.as_bytes() {
            [d] if d.is_ascii_digit() => portable_area = Some((d - b'0') as usize),
            _ if OPERATING_SUFFIXES.contains(&s) => {}
            _ => segments.push(s),
        }
    }

    let chosen = match segments.as_slice() {
        [] => return None,
        [only] => *only,
        [first, rest @ ..] => rest.iter().fold(*first, |best, &s| if s.len() < best.len() { s } else { best }),
    };

    if chosen.bytes().all(|b| b.is_ascii_alphanumeric()) { Some((chosen.to_string(), portable_area)) } else { None }
}

fn is_plain_us_prefix(prefix: &str) -> bool {
    matches!(prefix, "K" | "W" | "N") || (prefix.len() == 2 && prefix.starts_with('A') && prefix.as_bytes()[1] <= b'K')
}

/// First digit in the callsign, e.g. `6` for `W6ABC`.
fn call_area_digit(call: &str) -> Option<usize> {
    call.bytes().find(u8::is_ascii_digit).map(|b| (b - b'0') as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn near(a: LatLon, lat: f64, lon: f64) -> bool {
        (a.lat - lat).abs() < 0.01 && (a.lon - lon).abs() < 0.01
    }

    #[test]
    fn longest_prefix_wins() {
        let geo = GeoEstimator::new();
        assert!(near(geo.locate("VK2ABC").unwrap(), -33.9, 151.2));
        assert!(near(geo.locate("VK0XYZ").unwrap(), -25.3, 133.8));
        assert!(near(geo.locate("KH6ABC").unwrap(), 21.3, -157.8));
        assert!(near(geo.locate("EA8TX").unwrap(), 28.3, -16.5));
    }

    #[test]
    fn us_call_area_refines() {
        let geo = GeoEstimator::new();
        assert!(near(geo.locate("W6XYZ").unwrap(), 36.5, -119.5));
        assert!(near(geo.locate("K1ABC").unwrap(), 42.5, -71.8));
        assert!(near(geo.locate("AA4XX").unwrap(), 33.5, -84.0));
    }

    #[test]
    fn portable_forms() {
        let geo = GeoEstimator::new();
        assert_eq!(geo.locate("g4abc/p"), geo.locate("G4ABC"));
        assert_eq!(geo.locate("K1ABC/VE3"), geo.locate("VE3XYZ"));
        assert_eq!(geo.locate("DL/K1ABC/P"), geo.locate("DL1AA"));
    }

    #[test]
    fn portable_digit_selects_us_call_area() {
        let geo = GeoEstimator::new();
        assert_eq!(geo.locate("W1AW/4"), geo.locate("W4XYZ"));
        assert_ne!(geo.locate("W1AW/4"), geo.locate("W1AW"));
        assert_eq!(geo.locate("k6abc/0/p"), geo.locate("K0ABC"));
        // Outside the US the digit carries no area.
        assert_eq!(geo.locate("G4ABC/5"), geo.locate("G4ABC"));
        assert_eq!(geo.locate("JA1XYZ/3"), geo.locate("JA1XYZ"));
    }

    #[test]
    fn unknown_or_garbage_is_none() {
        let geo = GeoEstimator::new();
        assert!(geo.locate("").is_none());
        assert!(geo.locate("/P").is_none());
        assert!(geo.locate("Q1ABC").is_none());
        assert!(geo.locate("12#$").is_none());
    }

    #[test]
    fn deterministic() {
        let geo = GeoEstimator::new();
        assert_eq!(geo.locate("JA1XYZ"), geo.locate("JA1XYZ"));
    }
}
