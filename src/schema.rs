//! Field schema: the ordered list of extraction targets plus the subsets that
//! need special treatment downstream.
//!
//! The schema is data, not code. Output column order, the currency-bearing
//! subset (digit-normalised before hitting the sink), and the
//! singleton-designated subset (document-wide values copied into every row)
//! all come from one [`FieldSchema`] value threaded through the pipeline via
//! [`crate::config::ExtractionConfig`]. A built-in schema covers the Korean
//! comprehensive-income-tax notice this tool was written for; other document
//! families load their own schema from a JSON file with
//! [`FieldSchema::from_json_file`].

use crate::error::ExtractError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Placeholder written wherever a field is legitimately absent.
///
/// Chosen to match what the model itself is prompted to emit for empty cells,
/// so absence looks identical whether the model or the normaliser produced it.
pub const SENTINEL: &str = "N/A";

/// An ordered extraction schema.
///
/// Invariants (enforced by [`FieldSchema::new`]):
/// * `fields` is non-empty and duplicate-free,
/// * `currency_fields` and `singleton_fields` are subsets of `fields`.
///
/// Schema order defines sink column order. Immutable for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Every field to extract, in output column order.
    fields: Vec<String>,
    /// Fields whose values are currency-like and get digit-normalised.
    currency_fields: Vec<String>,
    /// Fields expected once per document, copied into every output row.
    singleton_fields: Vec<String>,
}

impl FieldSchema {
    /// Build a schema, validating the subset invariants.
    pub fn new(
        fields: Vec<String>,
        currency_fields: Vec<String>,
        singleton_fields: Vec<String>,
    ) -> Result<Self, ExtractError> {
        if fields.is_empty() {
            return Err(ExtractError::InvalidConfig(
                "schema must contain at least one field".into(),
            ));
        }
        let mut seen = HashSet::new();
        for f in &fields {
            if !seen.insert(f.as_str()) {
                return Err(ExtractError::InvalidConfig(format!(
                    "duplicate schema field '{f}'"
                )));
            }
        }
        for (subset, name) in [
            (&currency_fields, "currency"),
            (&singleton_fields, "singleton"),
        ] {
            if let Some(unknown) = subset.iter().find(|f| !seen.contains(f.as_str())) {
                return Err(ExtractError::InvalidConfig(format!(
                    "{name} field '{unknown}' is not in the schema field list"
                )));
            }
        }
        Ok(Self {
            fields,
            currency_fields,
            singleton_fields,
        })
    }

    /// Load a schema from a JSON file of the same shape as [`FieldSchema`].
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ExtractError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ExtractError::SchemaRead {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed: FieldSchema = serde_json::from_str(&raw).map_err(|e| {
            ExtractError::InvalidConfig(format!("schema file '{}': {e}", path.display()))
        })?;
        // Round-trip through `new` so file-supplied schemas get the same checks.
        Self::new(
            parsed.fields,
            parsed.currency_fields,
            parsed.singleton_fields,
        )
    }

    /// All fields in output column order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn is_currency(&self, field: &str) -> bool {
        self.currency_fields.iter().any(|f| f == field)
    }

    pub fn singleton_fields(&self) -> &[String] {
        &self.singleton_fields
    }

    /// The built-in schema for Korean comprehensive-income-tax guidance
    /// notices (종합소득세 신고안내문).
    ///
    /// One multi-row business-income table per document (the fields from
    /// "사업자 등록번호" onward vary per row); everything before it appears
    /// once per document and is singleton-designated.
    pub fn tax_notice() -> Self {
        let fields: Vec<String> = [
            "성명",
            "생년월일",
            "안내유형",
            "기장의무",
            "추계시 적용경비율",
            "소득종류",
            "이자",
            "배당",
            "근로-단일",
            "근로-복수",
            "연금",
            "기타",
            "종교인 기타소득유무",
            "중간예납세액",
            "원천징수세액",
            "국민연금보험료",
            "개인연금저축",
            "소기업소상공인공제부금 (노란우산공제)",
            "퇴직연금세액공제",
            "연금계좌세액공제",
            "사업자 등록번호",
            "상호",
            "수입금액 구분코드",
            "업종 코드",
            "사업 형태",
            "기장 의무",
            "경비율",
            "수입금액",
            "일반",
            "자가",
            "일반(기본)",
            "자가(초과)",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        let singleton_fields = fields[..20].to_vec();

        let currency_fields: Vec<String> = [
            "중간예납세액",
            "원천징수세액",
            "국민연금보험료",
            "개인연금저축",
            "소기업소상공인공제부금 (노란우산공제)",
            "퇴직연금세액공제",
            "연금계좌세액공제",
            "수입금액",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        Self::new(fields, currency_fields, singleton_fields)
            .expect("built-in schema is valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn tax_notice_schema_is_consistent() {
        let schema = FieldSchema::tax_notice();
        assert_eq!(schema.len(), 32);
        assert!(schema.is_currency("수입금액"));
        assert!(!schema.is_currency("성명"));
        assert!(schema.singleton_fields().contains(&"성명".to_string()));
        assert!(!schema.singleton_fields().contains(&"상호".to_string()));
    }

    #[test]
    fn rejects_empty_field_list() {
        assert!(FieldSchema::new(vec![], vec![], vec![]).is_err());
    }

    #[test]
    fn rejects_duplicate_fields() {
        let err = FieldSchema::new(strings(&["a", "b", "a"]), vec![], vec![]);
        assert!(err.is_err());
    }

    #[test]
    fn rejects_subset_outside_field_list() {
        let err = FieldSchema::new(strings(&["a", "b"]), strings(&["c"]), vec![]);
        assert!(matches!(err, Err(ExtractError::InvalidConfig(_))));
        let err = FieldSchema::new(strings(&["a", "b"]), vec![], strings(&["c"]));
        assert!(err.is_err());
    }

    #[test]
    fn loads_schema_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.json");
        std::fs::write(
            &path,
            r#"{
                "fields": ["name", "amount"],
                "currency_fields": ["amount"],
                "singleton_fields": ["name"]
            }"#,
        )
        .unwrap();

        let schema = FieldSchema::from_json_file(&path).unwrap();
        assert_eq!(schema.fields(), &["name".to_string(), "amount".to_string()]);
        assert!(schema.is_currency("amount"));
    }

    #[test]
    fn file_schema_gets_subset_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.json");
        std::fs::write(
            &path,
            r#"{"fields": ["name"], "currency_fields": ["amount"], "singleton_fields": []}"#,
        )
        .unwrap();
        assert!(FieldSchema::from_json_file(&path).is_err());
    }
}
