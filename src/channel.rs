//! Subscription channel: one WebSocket connection as an ordered event stream.
//!
//! [`spawn`] starts a connection task on the current tokio runtime. The
//! task reads frames and pushes [`ChannelEvent`] values into an unbounded
//! mpsc channel; the receiver is the only way to observe the connection.
//! Events arrive strictly in order, and each is fully handled by the
//! consumer before it reads the next one.
//!
//! ```text
//! CloseHandle ──(oneshot)──┐
//!                          ▼
//!   WsReader ──► connection task ──(mpsc)──► Session::drive
//! ```
//!
//! The channel never reconnects. After `Error` or `Closed` the task exits
//! and the event stream ends.

use std::fmt;

use tokio::sync::{mpsc, oneshot};

use crate::config::Config;
use crate::constants::{CLOSE_CODE_ABNORMAL, CLOSE_CODE_NORMAL};
use crate::ws::{self, TlsPolicy, WsMessage};

/// Event delivered by the subscription channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Handshake completed; frames may follow.
    Opened,
    /// One text frame.
    Frame(String),
    /// Transport failure. Terminal.
    Error(String),
    /// Connection closed. Terminal.
    Closed {
        /// WebSocket close code.
        code: u16,
        /// Close reason, possibly empty.
        reason: String,
        /// `true` when the close came from a [`CloseHandle`].
        requested: bool,
    },
}

impl ChannelEvent {
    /// Returns `true` for events after which nothing else is delivered.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChannelEvent::Error(_) | ChannelEvent::Closed { .. })
    }
}

/// Where and how to connect.
#[derive(Clone, PartialEq, Eq)]
pub struct ChannelTarget {
    /// Normalized `ws://` / `wss://` stream URL.
    pub url: String,
    /// Bearer token.
    pub token: String,
    /// Certificate handling.
    pub tls: TlsPolicy,
}

impl ChannelTarget {
    /// Build the target from configuration, normalizing the server URL.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            url: ws::subscription_url(&config.server_url),
            token: config.token.clone(),
            tls: TlsPolicy::from_verify(config.verify_tls),
        }
    }
}

impl fmt::Debug for ChannelTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelTarget")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .field("tls", &self.tls)
            .finish()
    }
}

/// Requests an orderly close of a running channel. Usable once.
#[derive(Debug)]
pub struct CloseHandle {
    tx: Option<oneshot::Sender<()>>,
}

impl CloseHandle {
    /// Ask the channel to close.
    ///
    /// Returns `true` if the request was delivered; later calls, and calls
    /// after the channel has already finished, return `false`.
    pub fn close(&mut self) -> bool {
        match self.tx.take() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }

    /// Returns `true` if [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_used(&self) -> bool {
        self.tx.is_none()
    }
}

/// Receiving half of a [`CloseHandle`], consumed by [`spawn`].
#[derive(Debug)]
pub struct CloseSignal {
    rx: oneshot::Receiver<()>,
}

/// Create a linked close handle / signal pair.
#[must_use]
pub fn close_pair() -> (CloseHandle, CloseSignal) {
    let (tx, rx) = oneshot::channel();
    (CloseHandle { tx: Some(tx) }, CloseSignal { rx })
}

/// Start the connection task on the current runtime.
///
/// Returns the ordered event stream. The first event is `Opened` or, if
/// the handshake fails, a terminal `Error`.
///
/// # Panics
///
/// Panics if called outside a tokio runtime.
pub fn spawn(target: ChannelTarget, close: CloseSignal) -> mpsc::UnboundedReceiver<ChannelEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(run_connection(target, close, tx));
    rx
}

/// Why the close branch of the select loop fired.
enum CloseRequest {
    Requested,
    HandleDropped,
}

async fn wait_close(rx: &mut oneshot::Receiver<()>) -> CloseRequest {
    match rx.await {
        Ok(()) => CloseRequest::Requested,
        Err(_) => CloseRequest::HandleDropped,
    }
}

fn requested_close() -> ChannelEvent {
    ChannelEvent::Closed {
        code: CLOSE_CODE_NORMAL,
        reason: "client requested close".to_string(),
        requested: true,
    }
}

async fn run_connection(
    target: ChannelTarget,
    close: CloseSignal,
    tx: mpsc::UnboundedSender<ChannelEvent>,
) {
    let mut close_rx = close.rx;
    let mut close_armed = true;

    let connect = ws::connect(&target.url, &target.token, target.tls);
    tokio::pin!(connect);

    let (mut writer, mut reader) = loop {
        tokio::select! {
            result = &mut connect => match result {
                Ok(pair) => break pair,
                Err(e) => {
                    let _ = tx.send(ChannelEvent::Error(format!("{e:#}")));
                    return;
                }
            },
            request = wait_close(&mut close_rx), if close_armed => match request {
                CloseRequest::Requested => {
                    log::debug!("Close requested before handshake completed");
                    let _ = tx.send(requested_close());
                    return;
                }
                CloseRequest::HandleDropped => close_armed = false,
            },
        }
    };

    if tx.send(ChannelEvent::Opened).is_err() {
        return;
    }

    loop {
        tokio::select! {
            frame = reader.recv() => {
                let event = match frame {
                    Some(Ok(WsMessage::Text(text))) => ChannelEvent::Frame(text),
                    Some(Ok(WsMessage::Binary(data))) => {
                        ChannelEvent::Frame(String::from_utf8_lossy(&data).into_owned())
                    }
                    Some(Ok(WsMessage::Ping | WsMessage::Pong)) => continue,
                    Some(Ok(WsMessage::Close { code, reason })) => ChannelEvent::Closed {
                        code,
                        reason,
                        requested: false,
                    },
                    Some(Err(e)) => ChannelEvent::Error(format!("{e:#}")),
                    None => ChannelEvent::Closed {
                        code: CLOSE_CODE_ABNORMAL,
                        reason: "stream ended".to_string(),
                        requested: false,
                    },
                };
                if matches!(event, ChannelEvent::Closed { .. }) {
                    if let Err(e) = writer.close().await {
                        log::debug!("Close reply not sent: {e:#}");
                    }
                }
                let terminal = event.is_terminal();
                if tx.send(event).is_err() || terminal {
                    return;
                }
            }
            request = wait_close(&mut close_rx), if close_armed => match request {
                CloseRequest::Requested => {
                    if let Err(e) = writer.send_close().await {
                        log::debug!("Close frame not sent: {e:#}");
                    }
                    let _ = tx.send(requested_close());
                    return;
                }
                CloseRequest::HandleDropped => close_armed = false,
            },
        }
    }
}
