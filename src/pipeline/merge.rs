//! Singleton merge: document-wide values copied into every row-level record.
//!
//! ## Why a merge at all?
//!
//! A tax notice embeds exactly one multi-row business-income table alongside
//! scattered single-occurrence fields (person name, birth date, withholding
//! tax). The model is prompted to copy the singletons into every row object,
//! but it frequently puts them only in the first object and leaves the rest
//! with sentinels. The merge engine re-establishes the invariant in code:
//! collect the document-wide truth once, then overlay it onto every record.
//!
//! Collision policy: singleton values win. If a row-level object redundantly
//! encodes a singleton field, the document-level value replaces it.

use crate::record::RawRecord;
use crate::schema::{FieldSchema, SENTINEL};
use serde_json::Value;

/// Gather the document-wide singleton values from the record list.
///
/// For each singleton-designated field, the first substantive value (not
/// absent, not the sentinel, not blank) across the records wins. A field with
/// no substantive value anywhere is omitted — the merge then leaves whatever
/// the rows carry, which after normalisation is the sentinel.
pub fn collect_singletons(records: &[RawRecord], schema: &FieldSchema) -> RawRecord {
    let mut singletons = RawRecord::new();

    for field in schema.singleton_fields() {
        let found = records
            .iter()
            .filter_map(|r| r.get(field))
            .find(|v| is_substantive(v));
        if let Some(value) = found {
            singletons.insert(field.clone(), value.clone());
        }
    }

    singletons
}

/// Overlay the singleton values onto every row-level record.
///
/// Output has exactly as many records as `rows`; zero rows in, zero rows out
/// (a valid terminal state for a document with an empty income table).
pub fn merge_singletons(singletons: &RawRecord, rows: Vec<RawRecord>) -> Vec<RawRecord> {
    rows.into_iter()
        .map(|mut row| {
            for (field, value) in singletons {
                row.insert(field.clone(), value.clone());
            }
            row
        })
        .collect()
}

fn is_substantive(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => {
            let t = s.trim();
            !t.is_empty() && t != SENTINEL
        }
        _ => true,
    }
}
