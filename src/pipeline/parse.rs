//! Response parsing: recover a JSON payload from free-form model output.
//!
//! ## Why layered fallbacks?
//!
//! The model's output format is not contractually guaranteed. Despite being
//! prompted to answer with a bare JSON array, it sometimes wraps the payload
//! in ```` ```json ```` fences, and occasionally surrounds it with prose
//! ("Here is the extracted data: …"). The parser tries a sequence of
//! patterns, most-specific first, and accepts the first candidate that
//! decodes as a JSON array or object. A candidate that fails to decode is
//! swallowed and the next pattern is tried; only after every pattern is
//! exhausted does the parser fail.
//!
//! The parser is maximally tolerant of *packaging*, never of *content*: text
//! containing no decodable JSON value is a [`DocumentError::Parse`], not an
//! empty result.

use crate::error::DocumentError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

// Pattern order is significant: the array span wins over fenced blocks so a
// fenced array is still captured whole, and the bare-object span runs last
// because a single object is the least likely well-formed shape.
static RE_ARRAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\[.*\]").unwrap());
static RE_FENCED_JSON: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```json\s*(.*?)\s*```").unwrap());
static RE_FENCED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```\s*(.*?)\s*```").unwrap());
static RE_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

/// The shape of the decoded payload before list coercion.
enum Payload {
    /// A JSON array: used as-is.
    Array(Vec<Value>),
    /// A single JSON object: wrapped into a one-element list.
    Object(Value),
}

impl Payload {
    fn into_records(self) -> Vec<Value> {
        match self {
            Payload::Array(items) => items,
            Payload::Object(obj) => vec![obj],
        }
    }
}

/// Extract the list of records from raw model response text.
///
/// Elements of the returned list are still arbitrary JSON values — dropping
/// non-object elements and filling missing fields is the normaliser's job.
pub fn parse_records(text: &str) -> Result<Vec<Value>, DocumentError> {
    for candidate in candidates(text) {
        match serde_json::from_str::<Value>(&candidate) {
            Ok(Value::Array(items)) => {
                debug!("recovered JSON array with {} elements", items.len());
                return Ok(Payload::Array(items).into_records());
            }
            Ok(obj @ Value::Object(_)) => {
                debug!("recovered single JSON object; wrapping in a list");
                return Ok(Payload::Object(obj).into_records());
            }
            // Scalars (a fenced "42") are not a payload; keep trying.
            Ok(_) | Err(_) => continue,
        }
    }

    Err(DocumentError::Parse {
        response_len: text.len(),
    })
}

/// Candidate JSON texts in priority order.
///
/// Greedy spans deliberately: `[ … ] prose [ … ]` yields the outermost span,
/// which then fails to decode and falls through, rather than silently
/// returning only the first array.
fn candidates(text: &str) -> Vec<String> {
    let mut out = Vec::with_capacity(4);
    if let Some(m) = RE_ARRAY.find(text) {
        out.push(m.as_str().to_string());
    }
    if let Some(caps) = RE_FENCED_JSON.captures(text) {
        out.push(caps[1].to_string());
    }
    if let Some(caps) = RE_FENCED.captures(text) {
        out.push(caps[1].to_string());
    }
    if let Some(m) = RE_OBJECT.find(text) {
        out.push(m.as_str().to_string());
    }
    out
}
