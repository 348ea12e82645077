//! Schema normalisation: guarantee every record carries every schema field.
//!
//! The model's records are best-effort: fields go missing, extraneous keys
//! appear, and cell text sometimes contains embedded line breaks from
//! multi-line table cells. This stage makes the record list safe for the
//! merge and row-building stages:
//!
//! * list elements that are not objects are dropped (counted, not fatal);
//! * every schema field absent from a record is inserted with the `"N/A"`
//!   sentinel — downstream code never sees a missing key;
//! * line breaks and carriage returns inside string values become single
//!   spaces, so a tabular sink never receives multi-line cell content.
//!
//! Extraneous non-schema fields are preserved; the row builder simply never
//! reads them.

use crate::record::RawRecord;
use crate::schema::{FieldSchema, SENTINEL};
use serde_json::Value;
use tracing::warn;

/// Normalise the parsed record list against the schema.
///
/// Graceful by policy: a malformed element costs that element, never the
/// document.
pub fn normalize_records(records: Vec<Value>, schema: &FieldSchema) -> Vec<RawRecord> {
    let total = records.len();
    let mut out = Vec::with_capacity(total);

    for (i, value) in records.into_iter().enumerate() {
        let mut record = match value {
            Value::Object(map) => map,
            other => {
                warn!(
                    "dropping element {}/{}: expected an object, got {}",
                    i + 1,
                    total,
                    json_type(&other)
                );
                continue;
            }
        };

        for field in schema.fields() {
            if !record.contains_key(field) {
                record.insert(field.clone(), Value::String(SENTINEL.to_string()));
            }
        }

        for (_, v) in record.iter_mut() {
            if let Value::String(s) = v {
                if s.contains('\n') || s.contains('\r') {
                    *s = s.replace('\n', " ").replace('\r', " ");
                }
            }
        }

        out.push(record);
    }

    if out.len() < total {
        warn!("kept {}/{} records after normalisation", out.len(), total);
    }
    out
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
