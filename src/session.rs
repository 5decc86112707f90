//! Session supervisor.
//!
//! Owns one connect-to-close lifecycle of the subscription channel:
//!
//! ```text
//! Idle ──start──► Connecting ──Opened──► Streaming ──Error/Closed──► Closed
//!                     │                    ▲    │
//!                     │                    └────┘ Frame: decode → extract → dispatch
//!                     └──────────Error/Closed──────────────────────► Closed
//! ```
//!
//! Frames are handled one at a time, in arrival order: the next event is
//! not read until the current frame's side effects have run. `Closed` is
//! terminal; there is no reconnect.

use tokio::sync::mpsc;

use crate::channel::{self, ChannelEvent, ChannelTarget, CloseSignal};
use crate::dispatch::{ClipboardSink, DispatchReport, Dispatcher, NotificationSink};
use crate::envelope;
use crate::error::PipelineError;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not started.
    Idle,
    /// Handshake in progress.
    Connecting,
    /// Receiving frames.
    Streaming,
    /// Finished. Terminal.
    Closed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Connecting => write!(f, "connecting"),
            SessionState::Streaming => write!(f, "streaming"),
            SessionState::Closed => write!(f, "closed"),
        }
    }
}

/// Counters and close details of a finished session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Frames received while streaming.
    pub frames_received: u64,
    /// Frames dropped because they failed to decode.
    pub frames_dropped: u64,
    /// Notifications whose code reached the clipboard.
    pub codes_copied: u64,
    /// Close code and reason, if the session ended with a close.
    pub close: Option<(u16, String)>,
    /// Transport error, if the session ended with one.
    pub error: Option<String>,
}

/// Drives the decode → extract → dispatch pipeline from channel events.
#[derive(Debug)]
pub struct Session<C, N> {
    target: ChannelTarget,
    dispatcher: Dispatcher<C, N>,
    state: SessionState,
    summary: SessionSummary,
}

impl<C: ClipboardSink, N: NotificationSink> Session<C, N> {
    /// Create an idle session for `target`.
    pub fn new(target: ChannelTarget, dispatcher: Dispatcher<C, N>) -> Self {
        Self {
            target,
            dispatcher,
            state: SessionState::Idle,
            summary: SessionSummary::default(),
        }
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Counters so far.
    pub fn summary(&self) -> &SessionSummary {
        &self.summary
    }

    /// Borrow the dispatcher (and through it the sinks).
    pub fn dispatcher(&self) -> &Dispatcher<C, N> {
        &self.dispatcher
    }

    /// Connect and run until the channel closes.
    ///
    /// Must be called inside a tokio runtime. `close` is the receiving end of
    /// the [`CloseHandle`](crate::channel::CloseHandle) used for interrupts.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ChannelError`] if the channel fails or closes
    /// before the handshake completes. Failures after that are normal ends of
    /// the session and are reported in the summary.
    pub async fn run(mut self, close: CloseSignal) -> Result<SessionSummary, PipelineError> {
        self.start();
        let events = channel::spawn(self.target.clone(), close);
        self.drive(events).await
    }

    /// `Idle → Connecting`.
    pub fn start(&mut self) {
        if self.state == SessionState::Idle {
            log::info!("Connecting to stream: {}", self.target.url);
            self.state = SessionState::Connecting;
        }
    }

    /// Consume `events` until a terminal event (or the end of the stream).
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub async fn drive(
        mut self,
        mut events: mpsc::UnboundedReceiver<ChannelEvent>,
    ) -> Result<SessionSummary, PipelineError> {
        self.start();
        let mut ever_streamed = false;
        let mut requested_close = false;

        while self.state != SessionState::Closed {
            let event = events.recv().await.unwrap_or_else(|| ChannelEvent::Closed {
                code: crate::constants::CLOSE_CODE_ABNORMAL,
                reason: "event stream ended".to_string(),
                requested: false,
            });
            if let ChannelEvent::Closed { requested, .. } = &event {
                requested_close = *requested;
            }
            self.handle_event(event);
            ever_streamed |= self.state == SessionState::Streaming;
        }

        if !ever_streamed && !requested_close {
            let detail = match (&self.summary.error, &self.summary.close) {
                (Some(error), _) => error.clone(),
                (None, Some((code, reason))) => format!("closed during handshake (code {code}): {reason}"),
                (None, None) => "channel ended during handshake".to_string(),
            };
            return Err(PipelineError::ChannelError(detail));
        }

        Ok(self.summary)
    }

    /// Apply one channel event to the state machine.
    pub fn handle_event(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Opened => {
                if self.state == SessionState::Connecting {
                    log::info!("Connection established, listening for messages...");
                    self.state = SessionState::Streaming;
                } else {
                    log::warn!("Ignoring open event while {}", self.state);
                }
            }
            ChannelEvent::Frame(frame) => {
                if self.state == SessionState::Streaming {
                    self.summary.frames_received += 1;
                    if let Ok(report) = self.process_frame(&frame) {
                        if report.clipboard_written {
                            self.summary.codes_copied += 1;
                        }
                    } else {
                        self.summary.frames_dropped += 1;
                    }
                } else {
                    log::warn!("Ignoring frame received while {}", self.state);
                }
            }
            ChannelEvent::Error(detail) => {
                let err = PipelineError::ChannelError(detail.clone());
                log::error!("{}", err);
                self.summary.error = Some(detail);
                self.state = SessionState::Closed;
            }
            ChannelEvent::Closed { code, reason, .. } => {
                let err = PipelineError::ChannelClosed {
                    code,
                    reason: reason.clone(),
                };
                log::info!("Connection closed");
                log::info!("{}", err);
                self.summary.close = Some((code, reason));
                self.state = SessionState::Closed;
            }
        }
    }

    /// Decode one frame, print its summary to stdout, and dispatch it.
    ///
    /// # Errors
    ///
    /// Returns the decode error (already logged); the frame is dropped and
    /// the session carries on.
    pub fn process_frame(&mut self, frame: &str) -> Result<DispatchReport, PipelineError> {
        let notification = match envelope::decode(frame) {
            Ok(n) => n,
            Err(e) => {
                log::error!("{}", e);
                return Err(e);
            }
        };

        println!("{notification}");

        Ok(self.dispatcher.dispatch(&notification))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::NotificationStyle;
    use crate::error::ErrorKind;
    use crate::ws::TlsPolicy;
    use std::time::Duration;

    #[derive(Default, Debug)]
    struct Clip(Vec<String>);

    impl ClipboardSink for Clip {
        fn set_text(&mut self, text: &str) -> anyhow::Result<()> {
            self.0.push(text.to_string());
            Ok(())
        }
    }

    #[derive(Default, Debug)]
    struct Notes(Vec<String>);

    impl NotificationSink for Notes {
        fn notify(&mut self, _: &str, message: &str, _: &str, _: Duration) -> anyhow::Result<()> {
            self.0.push(message.to_string());
            Ok(())
        }
    }

    fn session() -> Session<Clip, Notes> {
        let target = ChannelTarget {
            url: "ws://localhost:8080/stream".to_string(),
            token: "t".to_string(),
            tls: TlsPolicy::Verify,
        };
        Session::new(
            target,
            Dispatcher::new(Clip::default(), Notes::default(), NotificationStyle::default()),
        )
    }

    fn feed(events: Vec<ChannelEvent>) -> mpsc::UnboundedReceiver<ChannelEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        for event in events {
            tx.send(event).unwrap();
        }
        rx
    }

    fn closed(code: u16) -> ChannelEvent {
        ChannelEvent::Closed {
            code,
            reason: String::new(),
            requested: false,
        }
    }

    #[test]
    fn test_state_transitions() {
        let mut s = session();
        assert_eq!(s.state(), SessionState::Idle);
        s.start();
        assert_eq!(s.state(), SessionState::Connecting);
        s.handle_event(ChannelEvent::Opened);
        assert_eq!(s.state(), SessionState::Streaming);
        s.handle_event(ChannelEvent::Frame(r#"{"id":1,"message":"1234"}"#.into()));
        assert_eq!(s.state(), SessionState::Streaming);
        s.handle_event(closed(1000));
        assert_eq!(s.state(), SessionState::Closed);
    }

    #[test]
    fn test_frame_before_open_is_ignored() {
        let mut s = session();
        s.start();
        s.handle_event(ChannelEvent::Frame(r#"{"id":1,"message":"1234"}"#.into()));
        assert_eq!(s.summary().frames_received, 0);
        assert!(s.dispatcher().clipboard().0.is_empty());
    }

    #[test]
    fn test_process_frame_reports_malformed() {
        let mut s = session();
        let err = s.process_frame("<html>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedFrame);
        assert!(s.dispatcher().notifier().0.is_empty());
    }

    #[tokio::test]
    async fn test_drive_counts_frames_and_drops() {
        let events = feed(vec![
            ChannelEvent::Opened,
            ChannelEvent::Frame(r#"{"id":1,"message":"code 4821"}"#.into()),
            ChannelEvent::Frame("garbage".into()),
            ChannelEvent::Frame(r#"{"id":2,"message":"no code"}"#.into()),
            closed(1000),
        ]);
        let summary = session().drive(events).await.unwrap();
        assert_eq!(summary.frames_received, 3);
        assert_eq!(summary.frames_dropped, 1);
        assert_eq!(summary.codes_copied, 1);
        assert_eq!(summary.close, Some((1000, String::new())));
    }

    #[tokio::test]
    async fn test_bad_frame_does_not_affect_next_frame() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(ChannelEvent::Opened).unwrap();
        tx.send(ChannelEvent::Frame("{not json".into())).unwrap();
        tx.send(ChannelEvent::Frame(r#"{"id":3,"message":"pin 777777"}"#.into()))
            .unwrap();
        tx.send(closed(1000)).unwrap();
        let summary = session().drive(rx).await.unwrap();
        assert_eq!(summary.frames_dropped, 1);
        assert_eq!(summary.codes_copied, 1);
    }

    #[tokio::test]
    async fn test_error_before_open_is_fatal() {
        let events = feed(vec![ChannelEvent::Error("connection refused".into())]);
        let err = session().drive(events).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ChannelError);
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_requested_close_before_open_is_not_fatal() {
        let events = feed(vec![ChannelEvent::Closed {
            code: 1000,
            reason: "client requested close".into(),
            requested: true,
        }]);
        let summary = session().drive(events).await.unwrap();
        assert_eq!(summary.frames_received, 0);
    }

    #[tokio::test]
    async fn test_error_after_open_ends_session_normally() {
        let events = feed(vec![
            ChannelEvent::Opened,
            ChannelEvent::Error("connection reset".into()),
        ]);
        let summary = session().drive(events).await.unwrap();
        assert_eq!(summary.error.as_deref(), Some("connection reset"));
    }

    #[tokio::test]
    async fn test_events_after_close_are_not_read() {
        let events = feed(vec![
            ChannelEvent::Opened,
            closed(1001),
            ChannelEvent::Frame(r#"{"id":9,"message":"1234"}"#.into()),
        ]);
        let summary = session().drive(events).await.unwrap();
        assert_eq!(summary.frames_received, 0);
        assert_eq!(summary.close, Some((1001, String::new())));
    }

    #[tokio::test]
    async fn test_stream_end_without_close_event() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(ChannelEvent::Opened).unwrap();
        drop(tx);
        let summary = session().drive(rx).await.unwrap();
        assert_eq!(summary.close.map(|(code, _)| code), Some(1006));
    }
}
