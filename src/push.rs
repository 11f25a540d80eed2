use std::io::ErrorKind;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, info, warn};
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{HandshakeError, Message, WebSocket};
use url::Url;

use crate::backoff::ReconnectConfig;
use crate::error::PushError;
use crate::state::{ChannelStatus, Delta, MatchPatch, MatchStatus};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);
const READ_TIMEOUT: Duration = Duration::from_millis(500);
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);
const STOP_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushMessage {
    MatchUpdate(MatchPatch),
    /// Any other tagged message; carries the tag.
    Ignored(String),
}

/// Decode one text frame. Only `match_update` messages produce a patch.
pub fn parse_push_message(raw: &str) -> Result<PushMessage, PushError> {
    let root: Value =
        serde_json::from_str(raw.trim()).map_err(|err| PushError::NotJson(err.to_string()))?;
    let kind = root
        .get("type")
        .and_then(Value::as_str)
        .ok_or(PushError::MissingField("type"))?;
    if kind != "match_update" {
        return Ok(PushMessage::Ignored(kind.to_string()));
    }
    let data = root
        .get("data")
        .filter(|v| v.is_object())
        .ok_or(PushError::MissingField("data"))?;

    let match_id = match data.get("match_id") {
        None | Some(Value::Null) => return Err(PushError::MissingField("match_id")),
        Some(v) => as_count(v).ok_or_else(|| invalid("match_id", v))?,
    };
    let home_score = opt_count(data, "home_score")?;
    let away_score = opt_count(data, "away_score")?;
    let minute = match opt_count(data, "minute")? {
        Some(m) => Some(u16::try_from(m).map_err(|_| PushError::InvalidField {
            field: "minute",
            value: m.to_string(),
        })?),
        None => None,
    };
    let status = match data.get("status") {
        None | Some(Value::Null) => None,
        Some(v) => Some(
            v.as_str()
                .and_then(MatchStatus::from_code)
                .ok_or_else(|| invalid("status", v))?,
        ),
    };

    Ok(PushMessage::MatchUpdate(MatchPatch {
        match_id,
        home_score,
        away_score,
        minute,
        status,
    }))
}

fn opt_count(data: &Value, field: &'static str) -> Result<Option<u32>, PushError> {
    match data.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => as_count(v).map(Some).ok_or_else(|| invalid(field, v)),
    }
}

/// Non-negative integer that fits u32. Integral floats are accepted.
fn as_count(v: &Value) -> Option<u32> {
    if let Some(n) = v.as_u64() {
        return u32::try_from(n).ok();
    }
    let f = v.as_f64()?;
    if f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64 {
        Some(f as u32)
    } else {
        None
    }
}

fn invalid(field: &'static str, v: &Value) -> PushError {
    PushError::InvalidField {
        field,
        value: v.to_string(),
    }
}

/// Runs the subscription until `stop` is set or the consumer hangs up.
pub fn spawn_push_channel(
    ws_url: String,
    reconnect: ReconnectConfig,
    tx: Sender<Delta>,
    stop: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::Builder::new()
        .name("push-channel".to_string())
        .spawn(move || run_push_channel(&ws_url, reconnect, &tx, &stop))
        .unwrap_or_else(|err| {
            warn!(%err, "failed to spawn push thread");
            thread::spawn(|| {})
        })
}

fn run_push_channel(
    ws_url: &str,
    reconnect: ReconnectConfig,
    tx: &Sender<Delta>,
    stop: &AtomicBool,
) {
    let url = match Url::parse(ws_url) {
        Ok(url) => url,
        Err(err) => {
            let _ = tx.send(Delta::Log(format!("[WARN] Invalid live channel url {ws_url}: {err}")));
            let _ = tx.send(Delta::Channel(ChannelStatus::Disabled));
            return;
        }
    };

    let mut attempt: u32 = 0;
    while !stop.load(Ordering::Relaxed) {
        if tx.send(Delta::Channel(ChannelStatus::Connecting)).is_err() {
            return;
        }
        match open_socket(&url, stop) {
            Ok(mut socket) => {
                info!(url = ws_url, "live channel connected");
                attempt = 0;
                if tx.send(Delta::Channel(ChannelStatus::Connected)).is_err() {
                    let _ = socket.close(None);
                    return;
                }
                match read_loop(&mut socket, tx, stop) {
                    LoopExit::Stopped => {
                        let _ = socket.close(None);
                        let _ = socket.flush();
                        return;
                    }
                    LoopExit::ConsumerGone => return,
                    LoopExit::Disconnected(reason) => {
                        warn!(%reason, "live channel disconnected");
                    }
                }
            }
            Err(ConnectError::Stopped) => return,
            Err(ConnectError::Failed(err)) => {
                debug!(%err, "live channel connect failed");
            }
        }

        attempt = attempt.saturating_add(1);
        let delay = reconnect.delay(attempt);
        if tx
            .send(Delta::Channel(ChannelStatus::Waiting { attempt, delay }))
            .is_err()
        {
            return;
        }
        sleep_unless_stopped(delay, stop);
    }
}

enum ConnectError {
    Stopped,
    Failed(String),
}

/// Every step of the connect is bounded so a silent endpoint cannot hold the
/// thread past a stop request.
fn open_socket(
    url: &Url,
    stop: &AtomicBool,
) -> Result<WebSocket<MaybeTlsStream<TcpStream>>, ConnectError> {
    let host = url
        .host_str()
        .ok_or_else(|| ConnectError::Failed("url has no host".to_string()))?;
    let port = url
        .port_or_known_default()
        .ok_or_else(|| ConnectError::Failed("url has no port".to_string()))?;
    let addrs = (host, port)
        .to_socket_addrs()
        .map_err(|err| ConnectError::Failed(format!("resolve {host}: {err}")))?;

    let mut last_err = format!("no address for {host}");
    let mut connected = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
            Ok(stream) => {
                connected = Some(stream);
                break;
            }
            Err(err) => last_err = format!("{addr}: {err}"),
        }
        if stop.load(Ordering::Relaxed) {
            return Err(ConnectError::Stopped);
        }
    }
    let stream = connected.ok_or(ConnectError::Failed(last_err))?;
    stream
        .set_read_timeout(Some(READ_TIMEOUT))
        .and_then(|()| stream.set_write_timeout(Some(WRITE_TIMEOUT)))
        .map_err(|err| ConnectError::Failed(format!("socket timeouts: {err}")))?;

    let deadline = Instant::now() + HANDSHAKE_TIMEOUT;
    let mut pending = tungstenite::client_tls(url.as_str(), stream);
    loop {
        match pending {
            Ok((socket, _resp)) => return Ok(socket),
            Err(HandshakeError::Interrupted(mid)) => {
                if stop.load(Ordering::Relaxed) {
                    return Err(ConnectError::Stopped);
                }
                if Instant::now() >= deadline {
                    return Err(ConnectError::Failed("handshake timed out".to_string()));
                }
                pending = mid.handshake();
            }
            Err(HandshakeError::Failure(err)) => return Err(ConnectError::Failed(err.to_string())),
        }
    }
}

enum LoopExit {
    Stopped,
    ConsumerGone,
    Disconnected(String),
}

fn read_loop(
    socket: &mut WebSocket<MaybeTlsStream<TcpStream>>,
    tx: &Sender<Delta>,
    stop: &AtomicBool,
) -> LoopExit {
    loop {
        if stop.load(Ordering::Relaxed) {
            return LoopExit::Stopped;
        }
        let msg = match socket.read() {
            Ok(msg) => msg,
            Err(tungstenite::Error::Io(err))
                if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                continue;
            }
            Err(err) => return LoopExit::Disconnected(err.to_string()),
        };
        let text = match msg {
            Message::Text(text) => text,
            Message::Binary(bytes) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => {
                    warn!("discarding non-utf8 binary frame");
                    continue;
                }
            },
            Message::Close(_) => return LoopExit::Disconnected("closed by server".to_string()),
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
        };
        match parse_push_message(&text) {
            Ok(PushMessage::MatchUpdate(patch)) => {
                if tx.send(Delta::Push(patch)).is_err() {
                    return LoopExit::ConsumerGone;
                }
            }
            Ok(PushMessage::Ignored(kind)) => debug!(kind, "ignoring push message"),
            Err(err) => warn!(%err, "discarding malformed push message"),
        }
    }
}

fn sleep_unless_stopped(total: Duration, stop: &AtomicBool) {
    let deadline = Instant::now() + total;
    while !stop.load(Ordering::Relaxed) {
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        thread::sleep(STOP_POLL.min(deadline - now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_float_scores_are_accepted() {
        let msg = parse_push_message(
            r#"{"type":"match_update","data":{"match_id":7,"home_score":2.0}}"#,
        )
        .expect("valid message");
        let PushMessage::MatchUpdate(patch) = msg else {
            panic!("expected a match update");
        };
        assert_eq!(patch.home_score, Some(2));
        assert_eq!(patch.away_score, None);
    }

    #[test]
    fn fractional_score_is_rejected() {
        let err = parse_push_message(
            r#"{"type":"match_update","data":{"match_id":7,"home_score":1.5}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, PushError::InvalidField { field: "home_score", .. }));
    }
}
