//! Row assembly: merged records → ordered string cells for the sink.
//!
//! Layout per row: the document identifier (populated only on the first row
//! of each document so repeated file names don't clutter the sheet), the
//! 1-based row index, then every schema field in schema order. Currency
//! fields pass through [`clean_currency`] on the way out.

use crate::pipeline::clean::clean_currency;
use crate::record::RawRecord;
use crate::schema::{FieldSchema, SENTINEL};
use serde_json::Value;

/// Leading structural columns, ahead of the schema fields.
pub const DOCUMENT_COLUMN: &str = "file_name";
pub const ROW_INDEX_COLUMN: &str = "row_index";

/// Header row for the tabular sink.
pub fn header(schema: &FieldSchema) -> Vec<String> {
    let mut cells = Vec::with_capacity(schema.len() + 2);
    cells.push(DOCUMENT_COLUMN.to_string());
    cells.push(ROW_INDEX_COLUMN.to_string());
    cells.extend(schema.fields().iter().cloned());
    cells
}

/// Build the output rows for one document.
pub fn build_rows(
    document: &str,
    records: &[RawRecord],
    schema: &FieldSchema,
) -> Vec<Vec<String>> {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let mut cells = Vec::with_capacity(schema.len() + 2);
            // Only the first row carries the document identifier.
            cells.push(if i == 0 { document.to_string() } else { String::new() });
            cells.push((i + 1).to_string());

            for field in schema.fields() {
                let text = cell_text(record.get(field));
                if schema.is_currency(field) {
                    cells.push(clean_currency(&text));
                } else {
                    cells.push(text);
                }
            }
            cells
        })
        .collect()
}

/// Stringify one cell value. Absent or null fields take the sentinel.
fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => SENTINEL.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        // Nested structures are rare model noise; keep them inspectable.
        Some(other) => other.to_string(),
    }
}
