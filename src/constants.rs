//! Application-wide constants for codemsg.
//!
//! Fixed protocol values, placeholder text and timing knobs live here so
//! the pipeline modules stay free of magic values.
//!
//! # Categories
//!
//! - **Protocol**: subscription path and auth header shape
//! - **Envelope**: placeholders for missing notification fields
//! - **Extraction**: bounds of a verification code
//! - **Dispatch**: desktop notification defaults
//! - **Lifecycle**: main-thread wait loop

use std::time::Duration;

// ============================================================================
// Protocol
// ============================================================================

/// Resource path of the server's real-time message stream.
pub const STREAM_PATH: &str = "/stream";

/// Scheme prefix for plain HTTP base addresses.
pub const HTTP_SCHEME: &str = "http://";

/// Scheme prefix for TLS HTTP base addresses.
pub const HTTPS_SCHEME: &str = "https://";

/// Scheme prefix for plain WebSocket addresses.
pub const WS_SCHEME: &str = "ws://";

/// Scheme prefix for TLS WebSocket addresses.
pub const WSS_SCHEME: &str = "wss://";

/// WebSocket close code used when the stream ends without a close frame.
pub const CLOSE_CODE_ABNORMAL: u16 = 1006;

/// WebSocket close code used for a locally requested close.
pub const CLOSE_CODE_NORMAL: u16 = 1000;

/// WebSocket close code reported when a close frame carries no status.
pub const CLOSE_CODE_NO_STATUS: u16 = 1005;

// ============================================================================
// Envelope
// ============================================================================

/// Placeholder for a notification without a title.
pub const DEFAULT_TITLE: &str = "No Title";

/// Placeholder for a notification without a message body.
///
/// Extraction still runs against this text; it contains no digits.
pub const DEFAULT_MESSAGE: &str = "No Message Content";

/// Placeholder for a notification without a date.
pub const DEFAULT_DATE: &str = "Unknown Date";

// ============================================================================
// Extraction
// ============================================================================

/// Shortest digit run accepted as a code.
pub const CODE_MIN_DIGITS: usize = 4;

/// Longest digit run accepted as a code.
pub const CODE_MAX_DIGITS: usize = 6;

/// Separator between multiple codes found in one message.
pub const CODE_SEPARATOR: &str = ",";

// ============================================================================
// Dispatch
// ============================================================================

/// Title token of every desktop notification ("SMS").
pub const NOTIFICATION_TITLE: &str = "短信";

/// Application identity attached to desktop notifications.
pub const APP_NAME: &str = "code";

/// Seconds a desktop notification stays on screen.
pub const NOTIFICATION_TIMEOUT_SECS: u64 = 60;

// ============================================================================
// Lifecycle
// ============================================================================

/// Sleep between checks of the shutdown flag on the main thread.
pub const MAIN_LOOP_TICK: Duration = Duration::from_secs(1);

/// Upper bound on waiting for the session thread after a close request.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Default base address when nothing is configured.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080";
