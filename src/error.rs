//! Error taxonomy of the ingestion pipeline.
//!
//! Every failure the session can observe maps to one [`PipelineError`]
//! variant. Per-frame variants are logged and the frame is dropped; channel
//! variants end the session. Startup glue uses `anyhow` instead.

use thiserror::Error;

/// Discriminant of a [`PipelineError`], for matching without payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Frame was not a JSON object.
    MalformedFrame,
    /// Frame parsed but a field could not be read.
    DecodeInternal,
    /// Transport-level failure.
    ChannelError,
    /// Orderly or remote-initiated close.
    ChannelClosed,
    /// Clipboard write failed.
    ClipboardUnavailable,
    /// Desktop notification failed.
    NotificationUnavailable,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::MalformedFrame => "MalformedFrame",
            ErrorKind::DecodeInternal => "DecodeInternal",
            ErrorKind::ChannelError => "ChannelError",
            ErrorKind::ChannelClosed => "ChannelClosed",
            ErrorKind::ClipboardUnavailable => "ClipboardUnavailable",
            ErrorKind::NotificationUnavailable => "NotificationUnavailable",
        };
        f.write_str(name)
    }
}

/// Failures reported by the decode / extract / dispatch pipeline and the
/// channel that feeds it.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The frame is not syntactically valid JSON (or not an object).
    #[error("malformed frame: {detail}, raw frame: {frame}")]
    MalformedFrame {
        /// The raw frame text as received.
        frame: String,
        /// Parser error message.
        detail: String,
    },

    /// The frame parsed but a field had an unexpected shape.
    #[error("failed to process notification: {detail}")]
    DecodeInternal {
        /// What went wrong.
        detail: String,
    },

    /// The transport reported a failure.
    #[error("channel error: {0}")]
    ChannelError(String),

    /// The transport closed.
    #[error("channel closed (code {code}): {reason}")]
    ChannelClosed {
        /// WebSocket close code.
        code: u16,
        /// Close reason, possibly empty.
        reason: String,
    },

    /// Writing the clipboard failed.
    #[error("clipboard unavailable: {0}")]
    ClipboardUnavailable(String),

    /// Raising a desktop notification failed.
    #[error("notification unavailable: {0}")]
    NotificationUnavailable(String),
}

impl PipelineError {
    /// Payload-free discriminant of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::MalformedFrame { .. } => ErrorKind::MalformedFrame,
            PipelineError::DecodeInternal { .. } => ErrorKind::DecodeInternal,
            PipelineError::ChannelError(_) => ErrorKind::ChannelError,
            PipelineError::ChannelClosed { .. } => ErrorKind::ChannelClosed,
            PipelineError::ClipboardUnavailable(_) => ErrorKind::ClipboardUnavailable,
            PipelineError::NotificationUnavailable(_) => ErrorKind::NotificationUnavailable,
        }
    }

    /// Returns `true` for errors confined to a single frame.
    ///
    /// These never end the session.
    #[must_use]
    pub fn is_per_frame(&self) -> bool {
        !matches!(
            self.kind(),
            ErrorKind::ChannelError | ErrorKind::ChannelClosed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        let err = PipelineError::MalformedFrame {
            frame: "oops".to_string(),
            detail: "expected value".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::MalformedFrame);
        assert_eq!(
            PipelineError::ClipboardUnavailable("x".into()).kind(),
            ErrorKind::ClipboardUnavailable
        );
    }

    #[test]
    fn test_malformed_frame_message_carries_raw_frame() {
        let err = PipelineError::MalformedFrame {
            frame: "not json".to_string(),
            detail: "expected ident at line 1 column 2".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("not json"));
        assert!(text.contains("expected ident"));
    }

    #[test]
    fn test_channel_errors_are_not_per_frame() {
        assert!(!PipelineError::ChannelError("reset".into()).is_per_frame());
        assert!(!PipelineError::ChannelClosed {
            code: 1000,
            reason: String::new()
        }
        .is_per_frame());
        assert!(PipelineError::DecodeInternal {
            detail: "bad".into()
        }
        .is_per_frame());
        assert!(PipelineError::NotificationUnavailable("none".into()).is_per_frame());
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ErrorKind::ChannelClosed.to_string(), "ChannelClosed");
    }
}
