//! Sans-IO state machine for one DXSpider acquisition session.
//!
//! The machine consumes socket events (connected, data, timer fired, closed)
//! and returns the [`SessionAction`]s the driver must perform. It owns no
//! socket and no clock, so every transition is unit-testable.
//!
//! ```text
//! Connecting ─► AwaitingLogin ─► AwaitingPrompt ─► Streaming ─► Draining ─► Closed
//!      │              │                │               │
//!      └──────────────┴────────────────┴───────────────┴──► Closed (watchdog / EOF / error)
//! ```
//!
//! Prompt detection is a substring match on accumulated text against short
//! ordered phrase lists. Banners vary in punctuation and case between nodes.

use std::time::Duration;

use dx_core::Spot;
use dx_core::config::DxSpiderConfig;
use dx_core::dedup::SpotDedup;
use tracing::debug;

use super::line_parser;
use crate::line_util::TelnetDecoder;

/// Phrases that mean "the node wants a callsign now".
pub const LOGIN_PHRASES: &[&str] = &["login:", "enter your call", "your call:", "callsign:", "call:"];

/// Phrases that mean "login accepted, the node is at its prompt".
pub const GREETING_PHRASES: &[&str] = &["hello", "welcome", "dxspider", "cluster", " de ", ">"];

/// Text kept while waiting for a prompt; older text is dropped.
const PROMPT_BUFFER_LIMIT: usize = 8 * 1024;

/// Longest partial line held while streaming. A line that outgrows it is
/// discarded up to its newline.
const STREAM_LINE_LIMIT: usize = 4 * 1024;

/// Lifecycle of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    AwaitingLogin,
    AwaitingPrompt,
    Streaming,
    Draining,
    Closed,
}

/// What the driver must do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Write one line (the driver appends CRLF).
    Send(String),
    /// Arm the grace timer; call [`SessionMachine::on_timer`] when it fires.
    StartTimer(Duration),
    /// Close the socket now.
    Close,
}

/// Per-session parameters, derived from [`DxSpiderConfig`].
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub login_call: String,
    pub list_command: String,
    pub bye_command: String,
    pub target_spots: usize,
    pub prompt_grace: Duration,
    pub drain_grace: Duration,
}

impl From<&DxSpiderConfig> for SessionSettings {
    fn from(cfg: &DxSpiderConfig) -> Self {
        Self {
            login_call: cfg.login_call.trim().to_string(),
            list_command: cfg.effective_list_command(),
            bye_command: cfg.bye_command.clone(),
            target_spots: cfg.target_spots,
            prompt_grace: cfg.prompt_grace(),
            drain_grace: cfg.drain_grace(),
        }
    }
}

/// One acquisition attempt.
pub struct SessionMachine {
    settings: SessionSettings,
    state: SessionState,
    buffer: String,
    telnet: TelnetDecoder,
    /// Dropping the remainder of an over-long streamed line.
    skipping_line: bool,
    greeted: bool,
    listed: bool,
    spots: Vec<Spot>,
    dedup: SpotDedup,
}

impl SessionMachine {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            settings,
            state: SessionState::Connecting,
            buffer: String::new(),
            telnet: TelnetDecoder::new(),
            skipping_line: false,
            greeted: false,
            listed: false,
            spots: Vec::new(),
            dedup: SpotDedup::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Spots collected so far, in arrival order.
    #[cfg(test)]
    fn spots(&self) -> &[Spot] {
        &self.spots
    }

    pub fn into_spots(self) -> Vec<Spot> {
        self.spots
    }

    /// `true` once the listing command has been sent.
    pub fn reached_streaming(&self) -> bool {
        self.listed
    }

    /// The TCP connection is established.
    pub fn on_connected(&mut self) -> Vec<SessionAction> {
        if self.state == SessionState::Connecting {
            self.transition(SessionState::AwaitingLogin);
        }
        Vec::new()
    }

    /// A chunk of bytes arrived from the node.
    pub fn on_data(&mut self, chunk: &[u8]) -> Vec<SessionAction> {
        let text = self.telnet.decode(chunk);
        match self.state {
            SessionState::AwaitingLogin => {
                self.push_prompt_text(&text);
                if contains_phrase(&self.buffer, LOGIN_PHRASES) {
                    self.buffer.clear();
                    self.transition(SessionState::AwaitingPrompt);
                    return vec![SessionAction::Send(self.settings.login_call.clone())];
                }
                Vec::new()
            }
            SessionState::AwaitingPrompt => {
                if self.greeted {
                    return Vec::new();
                }
                self.push_prompt_text(&text);
                if contains_phrase(&self.buffer, GREETING_PHRASES) {
                    self.greeted = true;
                    self.buffer.clear();
                    return vec![SessionAction::StartTimer(self.settings.prompt_grace)];
                }
                Vec::new()
            }
            SessionState::Streaming => {
                self.buffer.push_str(&text);
                self.consume_lines()
            }
            SessionState::Connecting | SessionState::Draining | SessionState::Closed => Vec::new(),
        }
    }

    /// The grace timer armed by the last [`SessionAction::StartTimer`] fired.
    pub fn on_timer(&mut self) -> Vec<SessionAction> {
        match self.state {
            SessionState::AwaitingPrompt if self.greeted => {
                self.buffer.clear();
                self.listed = true;
                self.transition(SessionState::Streaming);
                vec![SessionAction::Send(self.settings.list_command.clone())]
            }
            SessionState::Draining => {
                self.transition(SessionState::Closed);
                vec![SessionAction::Close]
            }
            _ => Vec::new(),
        }
    }

    /// The socket closed (EOF, error, or watchdog).
    ///
    /// A final unterminated line is still parsed when streaming.
    pub fn on_closed(&mut self) {
        if self.state == SessionState::Streaming {
            let rest = self.telnet.finish();
            self.buffer.push_str(&rest);
        }
        if self.state == SessionState::Streaming && !self.skipping_line && !self.buffer.trim().is_empty() {
            let tail = std::mem::take(&mut self.buffer);
            self.accept_line(&tail);
        }
        self.transition(SessionState::Closed);
    }

    /// Parse complete lines from the buffer; keep a trailing partial line.
    fn consume_lines(&mut self) -> Vec<SessionAction> {
        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            if std::mem::take(&mut self.skipping_line) {
                continue;
            }
            self.accept_line(&line);

            if self.spots.len() >= self.settings.target_spots {
                self.buffer.clear();
                self.transition(SessionState::Draining);
                return vec![
                    SessionAction::Send(self.settings.bye_command.clone()),
                    SessionAction::StartTimer(self.settings.drain_grace),
                ];
            }
        }
        if self.buffer.len() > STREAM_LINE_LIMIT {
            debug!("[dxspider] dropping over-long line ({} bytes without newline)", self.buffer.len());
            self.buffer.clear();
            self.skipping_line = true;
        }
        Vec::new()
    }

    fn accept_line(&mut self, line: &str) {
        if let Some(spot) = line_parser::parse_line(line) {
            if self.dedup.check_and_insert(&spot) {
                self.spots.push(spot);
            }
        }
    }

    fn push_prompt_text(&mut self, text: &str) {
        self.buffer.push_str(text);
        if self.buffer.len() > PROMPT_BUFFER_LIMIT {
            let mut cut = self.buffer.len() - PROMPT_BUFFER_LIMIT;
            while !self.buffer.is_char_boundary(cut) {
                cut += 1;
            }
            self.buffer.drain(..cut);
        }
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            debug!("[dxspider] session {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }
}

/// Case-insensitive substring match against an ordered phrase list.
fn contains_phrase(haystack: &str, phrases: &[&str]) -> bool {
    let lower = haystack.to_ascii_lowercase();
    phrases.iter().any(|p| lower.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(target: usize) -> SessionSettings {
        SessionSettings {
            login_call: "N0CALL".into(),
            list_command: format!("sh/dx {target}"),
            bye_command: "bye".into(),
            target_spots: target,
            prompt_grace: Duration::from_millis(1000),
            drain_grace: Duration::from_millis(500),
        }
    }

    fn streaming(target: usize) -> SessionMachine {
        let mut m = SessionMachine::new(settings(target));
        m.on_connected();
        m.on_data(b"Welcome to GB7DJK\r\nlogin: ");
        m.on_data(b"Hello N0CALL, this is GB7DJK\r\nN0CALL de GB7DJK >\r\n");
        m.on_timer();
        assert_eq!(m.state(), SessionState::Streaming);
        m
    }

    fn spot_line(i: usize) -> String {
        format!("DX de G4ABC:  {}.0  K{}ABC  FT8  1423Z\r\n", 14000 + i, i % 10)
    }

    #[test]
    fn full_handshake() {
        let mut m = SessionMachine::new(settings(25));
        assert_eq!(m.state(), SessionState::Connecting);
        assert!(m.on_connected().is_empty());
        assert_eq!(m.state(), SessionState::AwaitingLogin);

        assert_eq!(m.on_data(b"Please enter your call: "), vec![SessionAction::Send("N0CALL".into())]);
        assert_eq!(m.state(), SessionState::AwaitingPrompt);

        assert_eq!(
            m.on_data(b"Hello Fred, this is GB7DJK\r\n"),
            vec![SessionAction::StartTimer(Duration::from_millis(1000))]
        );
        // Banner keeps flushing during the grace period.
        assert!(m.on_data(b"N0CALL de GB7DJK 5-Jan-2024 1423Z dxspider >").is_empty());

        assert_eq!(m.on_timer(), vec![SessionAction::Send("sh/dx 25".into())]);
        assert_eq!(m.state(), SessionState::Streaming);
    }

    #[test]
    fn login_phrase_twice_sends_credential_once() {
        let mut m = SessionMachine::new(settings(25));
        m.on_connected();
        let actions = m.on_data(b"login: \r\nlogin: ");
        assert_eq!(actions, vec![SessionAction::Send("N0CALL".into())]);

        // A repeated prompt after the state advanced is not answered again.
        let actions = m.on_data(b"login: ");
        assert!(!actions.iter().any(|a| matches!(a, SessionAction::Send(_))));
    }

    #[test]
    fn login_phrase_split_across_chunks() {
        let mut m = SessionMachine::new(settings(25));
        m.on_connected();
        assert!(m.on_data(b"Welcome\r\nlog").is_empty());
        assert_eq!(m.on_data(b"in: "), vec![SessionAction::Send("N0CALL".into())]);
    }

    #[test]
    fn prompt_detection_is_case_insensitive() {
        let mut m = SessionMachine::new(settings(25));
        m.on_connected();
        assert_eq!(m.on_data(b"LOGIN:"), vec![SessionAction::Send("N0CALL".into())]);
        assert_eq!(m.on_data(b"WELCOME"), vec![SessionAction::StartTimer(Duration::from_millis(1000))]);
    }

    #[test]
    fn duplicate_spots_keep_first() {
        let mut m = streaming(25);
        m.on_data(b"DX de G4ABC: 14074.0 JA1XYZ FT8 -10dB 1423Z\r\n");
        m.on_data(b"DX de DL1AA: 14074.0 JA1XYZ FT8 strong 1424Z\r\n");
        assert_eq!(m.spots().len(), 1);
        assert_eq!(m.spots()[0].comment, "FT8 -10dB");
        assert_eq!(m.spots()[0].spotter, "G4ABC");
    }

    #[test]
    fn quota_reached_moves_to_draining() {
        let mut m = streaming(20);
        let mut last = Vec::new();
        for i in 0..20 {
            last = m.on_data(spot_line(i).as_bytes());
        }
        assert_eq!(m.state(), SessionState::Draining);
        assert_eq!(
            last,
            vec![SessionAction::Send("bye".into()), SessionAction::StartTimer(Duration::from_millis(500))]
        );

        // Further data is ignored, the drain timer closes.
        assert!(m.on_data(spot_line(99).as_bytes()).is_empty());
        assert_eq!(m.on_timer(), vec![SessionAction::Close]);
        assert_eq!(m.state(), SessionState::Closed);
        assert_eq!(m.into_spots().len(), 20);
    }

    #[test]
    fn quota_stops_mid_chunk() {
        let mut m = streaming(2);
        let chunk: String = (0..5).map(spot_line).collect();
        let actions = m.on_data(chunk.as_bytes());
        assert_eq!(actions[0], SessionAction::Send("bye".into()));
        assert_eq!(m.spots().len(), 2);
    }

    #[test]
    fn partial_lines_wait_for_newline() {
        let mut m = streaming(25);
        m.on_data(b"DX de G4ABC: 14074.0 JA1XYZ FT8 ");
        assert!(m.spots().is_empty());
        m.on_data(b"1423Z\r\n");
        assert_eq!(m.spots().len(), 1);
    }

    #[test]
    fn close_flushes_final_unterminated_line() {
        let mut m = streaming(25);
        m.on_data(b"  14074.0  K1ABC  5-Jan-2024 1423Z  FT8  <SP5XYZ>");
        m.on_closed();
        assert_eq!(m.state(), SessionState::Closed);
        assert_eq!(m.spots().len(), 1);
    }

    #[test]
    fn endless_line_is_bounded_and_dropped() {
        let mut m = streaming(25);
        let junk = vec![b'x'; 4096];
        for _ in 0..4096 {
            m.on_data(&junk);
            assert!(m.buffer.len() <= STREAM_LINE_LIMIT);
        }
        // The tail of the over-long line is not mistaken for a spot line.
        m.on_data(b" DX de G4ABC: 14074.0 JA1XYZ FT8 1423Z\r\n");
        assert!(m.spots().is_empty());

        m.on_data(b"DX de G4ABC: 14074.0 JA1XYZ FT8 1423Z\r\n");
        assert_eq!(m.spots().len(), 1);
    }

    #[test]
    fn telnet_subnegotiation_inside_stream_is_ignored() {
        let mut m = streaming(25);
        let mut chunk = b"DX de G4ABC: 14074.0 ".to_vec();
        chunk.extend_from_slice(&[255, 250, 24, 1, 255, 240]);
        chunk.extend_from_slice(b"JA1XYZ FT8 1423Z\r\n");
        m.on_data(&chunk);
        assert_eq!(m.spots()[0].dx_call, "JA1XYZ");
    }

    #[test]
    fn early_close_without_prompts_yields_nothing() {
        let mut m = SessionMachine::new(settings(25));
        m.on_connected();
        m.on_data(b"Connection refused by policy\r\n");
        m.on_closed();
        assert_eq!(m.state(), SessionState::Closed);
        assert!(!m.reached_streaming());
        assert!(m.into_spots().is_empty());
    }

    #[test]
    fn timer_before_greeting_is_ignored() {
        let mut m = SessionMachine::new(settings(25));
        m.on_connected();
        m.on_data(b"login:");
        assert!(m.on_timer().is_empty());
        assert_eq!(m.state(), SessionState::AwaitingPrompt);
    }
}
