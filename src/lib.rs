//! codemsg - verification code listener for Gotify-style push servers.
//!
//! Subscribes to a push server's real-time message stream, pulls one-time
//! verification codes out of each message body, copies them to the
//! clipboard and raises a desktop notification.
//!
//! # Architecture
//!
//! - **ws** - WebSocket transport (tokio-tungstenite) and URL normalization
//! - **channel** - Connection task exposing an ordered event stream
//! - **envelope** - JSON frame → [`Notification`]
//! - **extract** - Standalone 4-6 digit code extraction
//! - **dispatch** - Clipboard and desktop notification side effects
//! - **session** - State machine driving the pipeline
//!
//! # Modules
//!
//! - [`config`] - Configuration loading
//! - [`error`] - Pipeline error taxonomy
//! - [`constants`] - Protocol values and defaults

pub mod channel;
pub mod config;
pub mod constants;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod extract;
pub mod session;
pub mod ws;

// Re-export commonly used types
pub use channel::{ChannelEvent, ChannelTarget, CloseHandle};
pub use config::Config;
pub use dispatch::{ClipboardSink, DesktopNotifier, Dispatcher, NotificationSink, SystemClipboard};
pub use envelope::Notification;
pub use error::{ErrorKind, PipelineError};
pub use session::{Session, SessionState, SessionSummary};
