//! Wire envelope decoding.
//!
//! Each stream frame is a JSON object describing one pushed message:
//!
//! ```json
//! {"id": 7, "appid": 2, "title": "SMS", "message": "code 4821",
//!  "priority": 5, "date": "2026-10-18T09:12:44Z", "extras": {}}
//! ```
//!
//! Every key except `id` is optional and falls back to a fixed
//! placeholder. Keys this client does not know about are ignored.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::constants::{DEFAULT_DATE, DEFAULT_MESSAGE, DEFAULT_TITLE};
use crate::error::PipelineError;

/// One decoded push message.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// Server-assigned message ID.
    pub id: Option<i64>,
    /// Message title.
    pub title: String,
    /// Free-text body. The only field inspected for codes.
    pub message: String,
    /// Message priority.
    pub priority: i64,
    /// Server timestamp, verbatim.
    pub date: String,
    /// Opaque extras map, if the sender attached one.
    pub extras: Option<Map<String, Value>>,
}

/// Field-level view of the envelope; absent keys stay `None`.
#[derive(Debug, Deserialize)]
struct RawEnvelope {
    id: Option<i64>,
    title: Option<String>,
    message: Option<String>,
    priority: Option<i64>,
    date: Option<String>,
    extras: Option<Map<String, Value>>,
}

impl From<RawEnvelope> for Notification {
    fn from(raw: RawEnvelope) -> Self {
        Self {
            id: raw.id,
            title: raw.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            message: raw.message.unwrap_or_else(|| DEFAULT_MESSAGE.to_string()),
            priority: raw.priority.unwrap_or(0),
            date: raw.date.unwrap_or_else(|| DEFAULT_DATE.to_string()),
            extras: raw.extras,
        }
    }
}

/// Decode one raw text frame.
///
/// # Errors
///
/// - [`PipelineError::MalformedFrame`] if `frame` is not a JSON object.
/// - [`PipelineError::DecodeInternal`] if a known key has the wrong type.
pub fn decode(frame: &str) -> Result<Notification, PipelineError> {
    let value: Value = serde_json::from_str(frame).map_err(|e| PipelineError::MalformedFrame {
        frame: frame.to_string(),
        detail: e.to_string(),
    })?;

    if !value.is_object() {
        return Err(PipelineError::MalformedFrame {
            frame: frame.to_string(),
            detail: format!("expected a JSON object, got {}", json_type_name(&value)),
        });
    }

    let raw: RawEnvelope =
        serde_json::from_value(value).map_err(|e| PipelineError::DecodeInternal {
            detail: e.to_string(),
        })?;

    Ok(raw.into())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl std::fmt::Display for Notification {
    /// Multi-line, human-readable summary for the console log.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "--- New message received ---")?;
        match self.id {
            Some(id) => writeln!(f, "  ID: {}", id)?,
            None => writeln!(f, "  ID: None")?,
        }
        writeln!(f, "  Title: {}", self.title)?;
        writeln!(f, "  Message: {}", self.message)?;
        writeln!(f, "  Priority: {}", self.priority)?;
        writeln!(f, "  Date: {}", self.date)?;
        if let Some(extras) = self.extras.as_ref().filter(|e| !e.is_empty()) {
            let pretty = serde_json::to_string_pretty(extras).map_err(|_| std::fmt::Error)?;
            writeln!(f, "  Extras: {}", pretty)?;
        }
        write!(f, "{}", "-".repeat(25))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_decode_full_envelope() {
        let frame = r#"{"id":42,"appid":3,"title":"Bank","message":"code 4821","priority":8,
            "date":"2026-10-18T09:12:44Z","extras":{"client::display":{"contentType":"text/plain"}}}"#;
        let n = decode(frame).unwrap();
        assert_eq!(n.id, Some(42));
        assert_eq!(n.title, "Bank");
        assert_eq!(n.message, "code 4821");
        assert_eq!(n.priority, 8);
        assert_eq!(n.date, "2026-10-18T09:12:44Z");
        assert!(n.extras.unwrap().contains_key("client::display"));
    }

    #[test]
    fn test_decode_applies_defaults() {
        let n = decode(r#"{"id":1}"#).unwrap();
        assert_eq!(n.id, Some(1));
        assert_eq!(n.title, DEFAULT_TITLE);
        assert_eq!(n.message, DEFAULT_MESSAGE);
        assert_eq!(n.priority, 0);
        assert_eq!(n.date, DEFAULT_DATE);
        assert!(n.extras.is_none());
    }

    #[test]
    fn test_decode_empty_object_has_no_id() {
        let n = decode("{}").unwrap();
        assert_eq!(n.id, None);
    }

    #[test]
    fn test_non_json_frame_is_malformed() {
        let err = decode("definitely not json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedFrame);
        match err {
            PipelineError::MalformedFrame { frame, .. } => {
                assert_eq!(frame, "definitely not json");
            }
            other => panic!("expected MalformedFrame, got {other:?}"),
        }
    }

    #[test]
    fn test_json_array_is_malformed() {
        let err = decode("[1,2,3]").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedFrame);
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn test_wrong_field_type_is_decode_internal() {
        let err = decode(r#"{"id":1,"priority":"high"}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecodeInternal);
    }

    #[test]
    fn test_summary_lists_fields() {
        let n = decode(r#"{"id":9,"message":"hi","extras":{"k":"v"}}"#).unwrap();
        let summary = n.to_string();
        assert!(summary.contains("ID: 9"));
        assert!(summary.contains("Title: No Title"));
        assert!(summary.contains("Message: hi"));
        assert!(summary.contains("Priority: 0"));
        assert!(summary.contains("Date: Unknown Date"));
        assert!(summary.contains("\"k\": \"v\""));
    }

    #[test]
    fn test_summary_omits_empty_extras() {
        let n = decode(r#"{"id":9,"extras":{}}"#).unwrap();
        assert!(!n.to_string().contains("Extras"));
    }
}
