//! Request and response payload definitions for the faasbox server.
//!
//! This module defines the data structures for:
//! - Upload, run and run-now request bodies
//! - JSON responses for results, errors and status
//! - The envelope carried by each server-sent event

use faasbox_core::{
    engine::{ClassifiedOutput, OutputKind},
    pool::SlotSnapshot,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

//--------------------------------------------------------------------------------------------------
// Types: Requests
//--------------------------------------------------------------------------------------------------

/// Request payload for uploading a function
#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    /// Path the function is stored under
    pub path: String,

    /// Script source
    pub code: String,

    /// Language tag
    pub language: String,
}

/// Request payload for running a stored function
#[derive(Debug, Default, Deserialize)]
pub struct RunRequest {
    /// Input made available to the script
    #[serde(default)]
    pub input: Value,

    /// Whether to stream the output as server-sent events
    #[serde(default)]
    pub stream: bool,
}

/// Request payload for running inline code
#[derive(Debug, Deserialize)]
pub struct RunNowRequest {
    /// Script source
    #[serde(default)]
    pub code: String,

    /// Language tag
    #[serde(default)]
    pub language: String,

    /// Input made available to the script
    #[serde(default)]
    pub input: Value,

    /// Whether to stream the output as server-sent events
    #[serde(default)]
    pub stream: bool,
}

/// Query parameters for running a stored function
#[derive(Debug, Default, Deserialize)]
pub struct RunQuery {
    /// Version to run; missing or unparsable means latest
    pub version: Option<String>,
}

//--------------------------------------------------------------------------------------------------
// Types: Responses
//--------------------------------------------------------------------------------------------------

/// Response payload for a stored upload
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Normalized path
    pub path: String,

    /// Language tag
    pub language: String,

    /// New version timestamp
    pub version: i64,
}

/// Response payload carrying a plain message
#[derive(Debug, Serialize)]
pub struct RegularMessageResponse {
    /// The message
    pub message: String,
}

/// Response payload for errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human readable error
    pub error: String,
}

/// Response payload describing the execution pool
#[derive(Debug, Serialize)]
pub struct PoolStatusResponse {
    /// Active backend
    pub backend: String,

    /// Every slot and its state
    pub slots: Vec<SlotSnapshot>,

    /// Number of idle, queued slots
    pub available: usize,
}

/// The kind of a streamed event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamEventKind {
    /// An intermediate output line
    Log,

    /// The final result
    Result,

    /// A terminal failure
    Error,
}

/// The JSON envelope carried by each server-sent event
#[derive(Debug, Clone, Serialize)]
pub struct StreamEnvelope {
    /// Event kind
    pub event: StreamEventKind,

    /// Event payload
    pub data: Value,

    /// Classified payload type
    #[serde(rename = "type")]
    pub kind: OutputKind,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl RunQuery {
    /// The requested version, if it parses.
    pub fn version(&self) -> Option<i64> {
        self.version.as_deref().and_then(|v| v.trim().parse().ok())
    }
}

impl StreamEnvelope {
    /// Wraps classified output in an envelope.
    pub fn new(event: StreamEventKind, output: ClassifiedOutput) -> Self {
        Self {
            event,
            data: output.data,
            kind: output.kind,
        }
    }

    /// A terminal error envelope.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            event: StreamEventKind::Error,
            data: Value::String(message.into()),
            kind: OutputKind::Text,
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Converts request input into the text handed to the script: strings verbatim, `null` as empty,
/// anything else as JSON.
pub fn input_text(input: &Value) -> String {
    match input {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_input_text() {
        assert_eq!(input_text(&Value::Null), "");
        assert_eq!(input_text(&json!("{\"a\":1}")), "{\"a\":1}");
        assert_eq!(input_text(&json!({"a": 1})), "{\"a\":1}");
        assert_eq!(input_text(&json!(5)), "5");
    }

    #[test]
    fn test_run_query_version() {
        let query = |v: Option<&str>| RunQuery {
            version: v.map(String::from),
        };
        assert_eq!(query(None).version(), None);
        assert_eq!(query(Some("123")).version(), Some(123));
        assert_eq!(query(Some("latest")).version(), None);
    }

    #[test]
    fn test_envelope_field_order() {
        let envelope = StreamEnvelope::error("boom");
        assert_eq!(
            serde_json::to_string(&envelope).unwrap(),
            r#"{"event":"error","data":"boom","type":"text"}"#
        );
    }
}
