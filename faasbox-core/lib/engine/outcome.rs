use std::fmt;

use getset::Getters;
use serde::Serialize;
use serde_json::Value;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Substrings marking interpreter chatter that is dropped from `text` results.
const NOISE_MARKERS: &[&str] = &[
    "Warning:",
    "MODULE_TYPELESS_PACKAGE_JSON",
    "Use `node --trace-warnings",
    "ExperimentalWarning",
];

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The classified type of a piece of script output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// A JSON string.
    String,

    /// A JSON number.
    Number,

    /// Any other JSON value: object, array, boolean or null.
    Structured,

    /// Not JSON.
    Text,
}

/// A line of output together with its classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedOutput {
    /// The parsed value, or the cleaned text for [`OutputKind::Text`].
    pub data: Value,

    /// The classification.
    #[serde(rename = "type")]
    pub kind: OutputKind,
}

/// The result of a successful execution.
#[derive(Debug, Clone, PartialEq, Getters)]
#[getset(get = "pub with_prefix")]
pub struct ExecutionOutcome {
    /// The final stdout line exactly as the script wrote it.
    raw: String,

    /// The classified result.
    output: ClassifiedOutput,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ExecutionOutcome {
    /// Classifies the final output line of a run.
    pub fn from_final_line(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let output = classify(&raw);
        Self { raw, output }
    }

    /// Consumes the outcome, returning the classified result.
    pub fn into_output(self) -> ClassifiedOutput {
        self.output
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Classifies `raw` by attempting to parse it as JSON.
///
/// Strings and numbers keep their own kinds, every other JSON value is `structured`, and anything
/// that does not parse is `text` with interpreter noise and blank lines removed.
///
/// ## Example
///
/// ```
/// use faasbox_core::engine::{classify, OutputKind};
///
/// assert_eq!(classify("42").kind, OutputKind::Number);
/// assert_eq!(classify(r#"{"x":1}"#).kind, OutputKind::Structured);
/// assert_eq!(classify("hello world").kind, OutputKind::Text);
/// ```
pub fn classify(raw: &str) -> ClassifiedOutput {
    match serde_json::from_str::<Value>(raw.trim()) {
        Ok(value) => {
            let kind = match value {
                Value::String(_) => OutputKind::String,
                Value::Number(_) => OutputKind::Number,
                _ => OutputKind::Structured,
            };
            ClassifiedOutput { data: value, kind }
        }
        Err(_) => ClassifiedOutput {
            data: Value::String(clean_output(raw)),
            kind: OutputKind::Text,
        },
    }
}

/// Drops blank lines and known interpreter warnings.
pub fn clean_output(raw: &str) -> String {
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .filter(|line| !NOISE_MARKERS.iter().any(|marker| line.contains(marker)))
        .collect::<Vec<_>>()
        .join("\n")
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            OutputKind::String => "string",
            OutputKind::Number => "number",
            OutputKind::Structured => "structured",
            OutputKind::Text => "text",
        };
        f.write_str(kind)
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
    fn test_classify_json_values() {
        let string = classify("\"hello\"");
        assert_eq!(string.kind, OutputKind::String);
        assert_eq!(string.data, json!("hello"));

        let number = classify(" 3.5 ");
        assert_eq!(number.kind, OutputKind::Number);
        assert_eq!(number.data, json!(3.5));

        for raw in [r#"{"x":1}"#, "[1,2]", "true", "null"] {
            assert_eq!(classify(raw).kind, OutputKind::Structured, "{}", raw);
        }
    }

    #[test]
    fn test_classify_text_is_cleaned() {
        let raw = "(node:12) ExperimentalWarning: something\nresult line\n\n  \nWarning: foo";
        let text = classify(raw);

        assert_eq!(text.kind, OutputKind::Text);
        assert_eq!(text.data, json!("result line"));
        assert_eq!(classify("").data, json!(""));
    }

    #[test]
    fn test_clean_output_keeps_order() {
        let raw = "a\nUse `node --trace-warnings ...` to show\nb\n[MODULE_TYPELESS_PACKAGE_JSON] x\nc";
        assert_eq!(clean_output(raw), "a\nb\nc");
    }

    #[test]
    fn test_outcome_serializes_with_type_field() {
        let outcome = ExecutionOutcome::from_final_line(r#"{"x":1}"#);
        assert_eq!(outcome.get_raw(), r#"{"x":1}"#);

        let body = serde_json::to_value(outcome.into_output()).unwrap();
        assert_eq!(body, json!({"data": {"x": 1}, "type": "structured"}));
    }
}
