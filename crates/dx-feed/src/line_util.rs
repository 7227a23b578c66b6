//! Shared text-parsing helpers used by all upstream line parsers.
//!
//! Every parser funnels its raw fields through these functions, so the
//! [`Spot`](dx_core::Spot) invariants (upper-case calls, three-decimal MHz,
//! `HH:MMz` time) are established in exactly one place.

/// Frequencies at or above this value are kHz; below it they are already MHz.
pub const KHZ_THRESHOLD: f64 = 1000.0;

/// Smallest MHz value that still renders as a positive three-decimal string.
const MIN_RENDERED_MHZ: f64 = 0.0005;

/// Normalize a callsign field.
///
/// Trims, upper-cases, and drops a trailing `:`. Returns `None` for empty
/// input or characters outside `[A-Z0-9/#-]`.
pub fn normalize_call(raw: &str) -> Option<String> {
    let call = raw.trim().trim_end_matches(':').to_ascii_uppercase();
    if call.is_empty() || !call.bytes().any(|b| b.is_ascii_alphanumeric()) {
        return None;
    }
    if !call.bytes().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'/' | b'-' | b'#')) {
        return None;
    }
    Some(call)
}

/// Parse a frequency and render it in MHz with three decimals.
///
/// `14074.0` (kHz) → `"14.074"`; `145.500` (already MHz) → `"145.500"`.
/// Unparsable values, and values that render as `0.000` or below, are
/// rejected.
pub fn parse_freq_mhz(raw: &str) -> Option<String> {
    let value: f64 = fast_float2::parse(raw.trim()).ok()?;
    if !value.is_finite() {
        return None;
    }
    let mhz = if value >= KHZ_THRESHOLD { value / 1000.0 } else { value };
    if mhz < MIN_RENDERED_MHZ {
        return None;
    }
    Some(format!("{mhz:.3}"))
}

/// Render the leading `HHMM` of `raw` as `HH:MMz`.
///
/// Accepts `"1423"`, `"1423Z"`, `"1423 2024-01-05"`.
pub fn format_hhmm(raw: &str) -> Option<String> {
    let digits = raw.trim().get(..4)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hh: u8 = digits[..2].parse().ok()?;
    let mm: u8 = digits[2..].parse().ok()?;
    if hh > 23 || mm > 59 {
        return None;
    }
    Some(format!("{hh:02}:{mm:02}z"))
}

/// `true` for a `HHMMZ` token (case-insensitive zulu marker).
pub fn is_zulu_token(token: &str) -> bool {
    let b = token.as_bytes();
    b.len() == 5 && b[..4].iter().all(u8::is_ascii_digit) && matches!(b[4], b'Z' | b'z')
}

/// Collapse runs of whitespace and trim.
pub fn clean_comment(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ----------------------------------------------------------------------------
// Telnet stream decoding
// ----------------------------------------------------------------------------

const IAC: u8 = 255;
const SB: u8 = 250;
const SE: u8 = 240;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum TelnetState {
    #[default]
    Data,
    /// After `IAC`.
    Command,
    /// After `IAC WILL|WONT|DO|DONT`, expecting the option byte.
    Option,
    /// Inside `IAC SB ... IAC SE`.
    Subneg,
    /// `IAC` seen inside a subnegotiation.
    SubnegIac,
}

/// Incremental telnet-to-text decoder for one connection.
///
/// Drops IAC negotiation (including `SB ... SE` payloads), NULs and carriage
/// returns. Sequences and UTF-8 characters split across reads are completed
/// by the next chunk.
#[derive(Debug, Default)]
pub struct TelnetDecoder {
    state: TelnetState,
    /// Trailing bytes of an incomplete UTF-8 character.
    pending: Vec<u8>,
}

impl TelnetDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one chunk; an incomplete trailing character is held back.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut out = std::mem::take(&mut self.pending);
        out.reserve(chunk.len());
        for &b in chunk {
            self.state = match (self.state, b) {
                (TelnetState::Data, IAC) => TelnetState::Command,
                (TelnetState::Data, b'\r' | 0) => TelnetState::Data,
                (TelnetState::Data, b) => {
                    out.push(b);
                    TelnetState::Data
                }
                (TelnetState::Command, SB) => TelnetState::Subneg,
                (TelnetState::Command, 251..=254) => TelnetState::Option,
                (TelnetState::Command, _) | (TelnetState::Option, _) => TelnetState::Data,
                (TelnetState::Subneg, IAC) => TelnetState::SubnegIac,
                (TelnetState::Subneg, _) => TelnetState::Subneg,
                (TelnetState::SubnegIac, SE) => TelnetState::Data,
                (TelnetState::SubnegIac, _) => TelnetState::Subneg,
            };
        }
        let keep = incomplete_utf8_tail(&out);
        self.pending = out.split_off(out.len() - keep);
        String::from_utf8_lossy(&out).into_owned()
    }

    /// Flush held-back bytes at end of stream.
    pub fn finish(&mut self) -> String {
        let rest = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&rest).into_owned()
    }
}

/// Length of a trailing UTF-8 sequence that still needs continuation bytes.
fn incomplete_utf8_tail(bytes: &[u8]) -> usize {
    for back in 1..=bytes.len().min(3) {
        let b = bytes[bytes.len() - back];
        if b & 0xC0 == 0x80 {
            continue;
        }
        let needed = match b {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        };
        return if needed > back { back } else { 0 };
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freq_khz_is_scaled() {
        assert_eq!(parse_freq_mhz("14074.0").as_deref(), Some("14.074"));
        assert_eq!(parse_freq_mhz("1840").as_deref(), Some("1.840"));
        assert_eq!(parse_freq_mhz(" 28074.0 ").as_deref(), Some("28.074"));
    }

    #[test]
    fn freq_mhz_passes_through() {
        assert_eq!(parse_freq_mhz("145.500").as_deref(), Some("145.500"));
        assert_eq!(parse_freq_mhz("50.313").as_deref(), Some("50.313"));
        assert_eq!(parse_freq_mhz("0.0006").as_deref(), Some("0.001"));
    }

    #[test]
    fn freq_rejects_garbage() {
        assert!(parse_freq_mhz("0").is_none());
        assert!(parse_freq_mhz("-7000").is_none());
        assert!(parse_freq_mhz("abc").is_none());
        assert!(parse_freq_mhz("0.0004").is_none());
        assert!(parse_freq_mhz("inf").is_none());
        assert!(parse_freq_mhz("").is_none());
    }

    #[test]
    fn call_normalization() {
        assert_eq!(normalize_call(" dl1abc: ").as_deref(), Some("DL1ABC"));
        assert_eq!(normalize_call("ve3/k1abc").as_deref(), Some("VE3/K1ABC"));
        assert_eq!(normalize_call("W3LPL-#").as_deref(), Some("W3LPL-#"));
        assert!(normalize_call("").is_none());
        assert!(normalize_call(":").is_none());
        assert!(normalize_call("K1 ABC").is_none());
    }

    #[test]
    fn hhmm_formatting() {
        assert_eq!(format_hhmm("1423 2024-01-05").as_deref(), Some("14:23z"));
        assert_eq!(format_hhmm("0005Z").as_deref(), Some("00:05z"));
        assert!(format_hhmm("2460").is_none());
        assert!(format_hhmm("14:23").is_none());
        assert!(format_hhmm("12").is_none());
    }

    #[test]
    fn zulu_token() {
        assert!(is_zulu_token("1423Z"));
        assert!(is_zulu_token("0000z"));
        assert!(!is_zulu_token("1423"));
        assert!(!is_zulu_token("14.23Z"));
    }

    #[test]
    fn telnet_negotiation_is_stripped() {
        let raw = [255, 251, 1, b'l', b'o', b'g', b'i', b'n', b':', b'\r', b'\n', 255, 241];
        assert_eq!(TelnetDecoder::new().decode(&raw), "login:\n");
    }

    #[test]
    fn subnegotiation_payload_is_skipped() {
        // IAC SB NAWS 0 80 0 24 IAC SE
        let raw = [b'a', 255, 250, 31, 0, 80, 0, 24, 255, 240, b'b'];
        assert_eq!(TelnetDecoder::new().decode(&raw), "ab");
    }

    #[test]
    fn sequences_split_across_chunks() {
        let mut d = TelnetDecoder::new();
        assert_eq!(d.decode(&[b'x', 255]), "x");
        assert_eq!(d.decode(&[253]), "");
        assert_eq!(d.decode(&[1, b'y', 255, 250, b'Q']), "y");
        assert_eq!(d.decode(&[b'Q', 255, 240, b'z']), "z");
    }

    #[test]
    fn utf8_split_across_chunks() {
        let bytes = "Zürich".as_bytes();
        let mut d = TelnetDecoder::new();
        let first = d.decode(&bytes[..2]);
        let second = d.decode(&bytes[2..]);
        assert_eq!(first, "Z");
        assert_eq!(format!("{first}{second}"), "Zürich");
        assert_eq!(d.finish(), "");
    }

    #[test]
    fn finish_flushes_truncated_character() {
        let mut d = TelnetDecoder::new();
        assert_eq!(d.decode(&[b'a', 0xE2, 0x82]), "a");
        assert_eq!(d.finish(), "\u{FFFD}");
    }
}
