//! Async socket driver for [`SessionMachine`].
//!
//! One call to [`run_session`] opens a TCP connection, feeds every socket
//! event into the machine and performs the actions it returns. A single
//! watchdog deadline covers connect, handshake and streaming; whatever was
//! collected when it fires is the result.

use std::time::Duration;

use dx_core::Spot;
use dx_core::error::DxError;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::time::{Instant, sleep_until, timeout_at};
use tracing::{debug, info, warn};

use super::session::{SessionAction, SessionMachine, SessionSettings, SessionState};

const READ_BUF_SIZE: usize = 4096;

// ----------------------------------------------------------------------------
// Session
// ----------------------------------------------------------------------------

/// Run one session against `addr` (`host:port`).
///
/// Partial results on watchdog expiry or socket error are returned as `Ok`.
/// Zero spots is an error: [`DxError::Protocol`] if the listing command was
/// never sent, [`DxError::Empty`] otherwise.
pub async fn run_session(addr: &str, settings: SessionSettings, watchdog: Duration) -> Result<Vec<Spot>, DxError> {
    let started = Instant::now();
    let deadline = started + watchdog;

    let stream = timeout_at(deadline, TcpStream::connect(addr)).await.map_err(|_| DxError::Timeout(watchdog))??;
    let _ = stream.set_nodelay(true);
    debug!("[dxspider] connected to {addr}");

    let (mut reader, mut writer) = stream.into_split();
    let mut machine = SessionMachine::new(settings);
    let mut grace: Option<Instant> = None;
    let mut buf = vec![0u8; READ_BUF_SIZE];

    let actions = machine.on_connected();
    let mut closing = perform(&mut writer, actions, &mut grace, deadline).await;

    while !closing && machine.state() != SessionState::Closed {
        tokio::select! {
            _ = sleep_until(deadline) => {
                warn!("[dxspider] {addr}: watchdog fired after {watchdog:?} in state {:?}", machine.state());
                break;
            }
            _ = sleep_until(grace.unwrap_or(deadline)), if grace.is_some() => {
                grace = None;
                let actions = machine.on_timer();
                closing = perform(&mut writer, actions, &mut grace, deadline).await;
            }
            read = reader.read(&mut buf) => match read {
                Ok(0) => {
                    debug!("[dxspider] {addr}: closed by peer");
                    break;
                }
                Ok(n) => {
                    let actions = machine.on_data(&buf[..n]);
                    closing = perform(&mut writer, actions, &mut grace, deadline).await;
                }
                Err(e) => {
                    warn!("[dxspider] {addr}: read error: {e}");
                    break;
                }
            },
        }
    }

    machine.on_closed();
    let _ = timeout_at(deadline, writer.shutdown()).await;

    let listed = machine.reached_streaming();
    let spots = machine.into_spots();
    info!("[dxspider] {addr}: session ended with {} spot(s) in {:?}", spots.len(), started.elapsed());

    if spots.is_empty() {
        return Err(if listed {
            DxError::Empty
        } else {
            DxError::Protocol(format!("{addr}: prompts not observed before close"))
        });
    }
    Ok(spots)
}

/// Apply machine actions. Returns `true` when the session must close.
///
/// A failed write ends the session; the machine keeps what it parsed.
async fn perform(
    writer: &mut OwnedWriteHalf,
    actions: Vec<SessionAction>,
    grace: &mut Option<Instant>,
    deadline: Instant,
) -> bool {
    for action in actions {
        match action {
            SessionAction::Send(line) => {
                debug!("[dxspider] > {line}");
                let wire = format!("{line}\r\n");
                match timeout_at(deadline, writer.write_all(wire.as_bytes())).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        warn!("[dxspider] write failed: {e}");
                        return true;
                    }
                    Err(_) => return true,
                }
            }
            SessionAction::StartTimer(after) => *grace = Some(Instant::now() + after),
            SessionAction::Close => return true,
        }
    }
    false
}
