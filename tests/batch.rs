//! End-to-end batch tests against a scripted model client and in-memory
//! sinks. No network, no API keys — the model seam and the sink seam are the
//! two injection points the library exposes, and these tests exercise the
//! whole pipeline between them.

use async_trait::async_trait;
use pdf2rows::{
    batch::run_batch,
    sink::{ErrorSink, RowSink},
    ErrorRecord, ExtractionConfig, FieldSchema, ModelClient, SinkError, TransportError,
    UploadedDocument,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

// ── Test doubles ─────────────────────────────────────────────────────────────

/// Per-document canned behaviour for the model seam.
enum Script {
    /// Every `generate` call returns this text.
    Reply(&'static str),
    /// Every `generate` call fails with a transport error.
    Unavailable,
}

struct ScriptedClient {
    scripts: HashMap<&'static str, Script>,
    releases: AtomicUsize,
}

impl ScriptedClient {
    fn new(scripts: Vec<(&'static str, Script)>) -> Self {
        Self {
            scripts: scripts.into_iter().collect(),
            releases: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ModelClient for ScriptedClient {
    async fn upload(
        &self,
        _bytes: &[u8],
        display_name: &str,
    ) -> Result<UploadedDocument, TransportError> {
        Ok(UploadedDocument {
            name: display_name.to_string(),
            uri: format!("https://files.test/{display_name}"),
            mime_type: "application/pdf".into(),
        })
    }

    async fn generate(
        &self,
        document: &UploadedDocument,
        _prompt: &str,
    ) -> Result<String, TransportError> {
        match self.scripts.get(document.name.as_str()) {
            Some(Script::Reply(text)) => Ok(text.to_string()),
            Some(Script::Unavailable) => Err(TransportError::Generate {
                detail: "HTTP 503 Service Unavailable".into(),
            }),
            None => panic!("no script for document '{}'", document.name),
        }
    }

    async fn release(&self, _document: &UploadedDocument) -> Result<(), TransportError> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct MemoryRowSink {
    header: Option<Vec<String>>,
    rows: Vec<Vec<String>>,
}

impl RowSink for MemoryRowSink {
    fn ensure_header(&mut self, header: &[String]) -> Result<(), SinkError> {
        if self.header.is_none() {
            self.header = Some(header.to_vec());
        }
        Ok(())
    }

    fn append_rows(&mut self, rows: &[Vec<String>]) -> Result<(), SinkError> {
        self.rows.extend_from_slice(rows);
        Ok(())
    }
}

/// Row sink whose appends always fail, for the sink-rejection path.
struct RejectingRowSink;

impl RowSink for RejectingRowSink {
    fn ensure_header(&mut self, _header: &[String]) -> Result<(), SinkError> {
        Ok(())
    }

    fn append_rows(&mut self, _rows: &[Vec<String>]) -> Result<(), SinkError> {
        Err(SinkError {
            detail: "disk full".into(),
        })
    }
}

#[derive(Default)]
struct MemoryErrorSink {
    records: Vec<ErrorRecord>,
}

impl ErrorSink for MemoryErrorSink {
    fn append_error(&mut self, record: &ErrorRecord) -> Result<(), SinkError> {
        self.records.push(record.clone());
        Ok(())
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn test_schema() -> FieldSchema {
    FieldSchema::new(
        vec!["성명".into(), "수입금액".into(), "경비율".into()],
        vec!["수입금액".into()],
        vec!["성명".into()],
    )
    .unwrap()
}

fn test_config() -> ExtractionConfig {
    ExtractionConfig::builder()
        .schema(test_schema())
        .retry_backoff_ms(1)
        .build()
        .unwrap()
}

/// Create dummy PDF files and return their paths in name order.
fn write_documents(dir: &TempDir, names: &[&str]) -> Vec<PathBuf> {
    names
        .iter()
        .map(|name| {
            let path = dir.path().join(name);
            std::fs::write(&path, b"%PDF-1.4 test").unwrap();
            path
        })
        .collect()
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn single_document_single_row() {
    let dir = tempfile::tempdir().unwrap();
    let docs = write_documents(&dir, &["doc.pdf"]);
    let client = ScriptedClient::new(vec![(
        "doc.pdf",
        Script::Reply(r#"[{"성명":"홍길동","수입금액":"1,000,000"}]"#),
    )]);
    let mut rows = MemoryRowSink::default();
    let mut errors = MemoryErrorSink::default();

    let summary = run_batch(&docs, &test_config(), &client, &mut rows, &mut errors)
        .await
        .unwrap();

    assert_eq!(summary.documents, 1);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.rows_written, 1);

    assert_eq!(
        rows.header.as_deref().unwrap(),
        &["file_name", "row_index", "성명", "수입금액", "경비율"]
    );
    assert_eq!(
        rows.rows,
        vec![vec![
            "doc.pdf".to_string(),
            "1".to_string(),
            "홍길동".to_string(),
            "1000000".to_string(),
            "N/A".to_string(),
        ]]
    );
    assert!(errors.records.is_empty());
}

#[tokio::test]
async fn singletons_copied_into_every_row() {
    let dir = tempfile::tempdir().unwrap();
    let docs = write_documents(&dir, &["doc.pdf"]);
    // Singleton present only in the first row-level object; the merge engine
    // must propagate it.
    let client = ScriptedClient::new(vec![(
        "doc.pdf",
        Script::Reply(
            r#"[
                {"성명":"김철수","수입금액":"100","경비율":"10.0"},
                {"수입금액":"200","경비율":"20.0"}
            ]"#,
        ),
    )]);
    let mut rows = MemoryRowSink::default();
    let mut errors = MemoryErrorSink::default();

    let summary = run_batch(&docs, &test_config(), &client, &mut rows, &mut errors)
        .await
        .unwrap();

    assert_eq!(summary.rows_written, 2);
    assert_eq!(rows.rows.len(), 2);

    // Both rows carry the singleton name.
    assert_eq!(rows.rows[0][2], "김철수");
    assert_eq!(rows.rows[1][2], "김철수");
    // Row-specific fields differ.
    assert_eq!(rows.rows[0][3], "100");
    assert_eq!(rows.rows[1][3], "200");
    // Only the first row carries the document identifier.
    assert_eq!(rows.rows[0][0], "doc.pdf");
    assert_eq!(rows.rows[1][0], "");
    assert_eq!(rows.rows[0][1], "1");
    assert_eq!(rows.rows[1][1], "2");
}

#[tokio::test]
async fn failing_document_does_not_abort_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let docs = write_documents(&dir, &["a.pdf", "b.pdf", "c.pdf"]);
    let client = ScriptedClient::new(vec![
        ("a.pdf", Script::Reply(r#"[{"성명":"가","수입금액":"1"}]"#)),
        ("b.pdf", Script::Unavailable),
        ("c.pdf", Script::Reply(r#"[{"성명":"다","수입금액":"3"}]"#)),
    ]);
    let mut rows = MemoryRowSink::default();
    let mut errors = MemoryErrorSink::default();

    let summary = run_batch(&docs, &test_config(), &client, &mut rows, &mut errors)
        .await
        .unwrap();

    assert_eq!(summary.documents, 3);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.rows_written, 2);

    // Sink received rows for documents 1 and 3 only, in order.
    assert_eq!(rows.rows[0][0], "a.pdf");
    assert_eq!(rows.rows[1][0], "c.pdf");

    // Exactly one error record, for document 2, with the original error text.
    assert_eq!(errors.records.len(), 1);
    assert_eq!(errors.records[0].document, "b.pdf");
    assert!(errors.records[0].detail.contains("3 attempts"));
    assert!(errors.records[0].detail.contains("HTTP 503"));
}

#[tokio::test]
async fn exhausted_retries_release_once_per_attempt() {
    let dir = tempfile::tempdir().unwrap();
    let docs = write_documents(&dir, &["b.pdf"]);
    let client = ScriptedClient::new(vec![("b.pdf", Script::Unavailable)]);
    let mut rows = MemoryRowSink::default();
    let mut errors = MemoryErrorSink::default();

    run_batch(&docs, &test_config(), &client, &mut rows, &mut errors)
        .await
        .unwrap();

    // Three attempts, three uploads, three releases — nothing leaked.
    assert_eq!(client.releases.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn prose_wrapped_and_fenced_responses_are_recovered() {
    let dir = tempfile::tempdir().unwrap();
    let docs = write_documents(&dir, &["a.pdf", "b.pdf"]);
    let client = ScriptedClient::new(vec![
        (
            "a.pdf",
            Script::Reply("추출 결과입니다:\n[{\"성명\":\"홍길동\"}]\n감사합니다."),
        ),
        (
            "b.pdf",
            Script::Reply("```json\n{\"성명\":\"김철수\",\"수입금액\":\"2,000원\"}\n```"),
        ),
    ]);
    let mut rows = MemoryRowSink::default();
    let mut errors = MemoryErrorSink::default();

    let summary = run_batch(&docs, &test_config(), &client, &mut rows, &mut errors)
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 2);
    assert_eq!(rows.rows.len(), 2);
    assert_eq!(rows.rows[0][2], "홍길동");
    // Missing fields filled with the sentinel, currency cleaned.
    assert_eq!(rows.rows[0][3], "0");
    assert_eq!(rows.rows[1][3], "2000");
}

#[tokio::test]
async fn empty_record_list_counts_as_success_with_a_note() {
    let dir = tempfile::tempdir().unwrap();
    let docs = write_documents(&dir, &["empty.pdf"]);
    let client = ScriptedClient::new(vec![("empty.pdf", Script::Reply("[]"))]);
    let mut rows = MemoryRowSink::default();
    let mut errors = MemoryErrorSink::default();

    let summary = run_batch(&docs, &test_config(), &client, &mut rows, &mut errors)
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.rows_written, 0);
    assert!(rows.rows.is_empty());

    // The zero-row outcome is visible on the error trail but not a failure.
    assert_eq!(errors.records.len(), 1);
    assert!(errors.records[0].detail.contains("no valid records"));
}

#[tokio::test]
async fn sink_rejection_lands_on_the_error_trail() {
    let dir = tempfile::tempdir().unwrap();
    let docs = write_documents(&dir, &["doc.pdf"]);
    let client = ScriptedClient::new(vec![(
        "doc.pdf",
        Script::Reply(r#"[{"성명":"홍길동"}]"#),
    )]);
    let mut rows = RejectingRowSink;
    let mut errors = MemoryErrorSink::default();

    let summary = run_batch(&docs, &test_config(), &client, &mut rows, &mut errors)
        .await
        .unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.rows_written, 0);
    assert_eq!(errors.records.len(), 1);
    assert!(errors.records[0].detail.contains("disk full"));
}

#[tokio::test]
async fn unreadable_document_fails_without_touching_the_model() {
    let docs = vec![PathBuf::from("/no/such/document.pdf")];
    let client = ScriptedClient::new(vec![]);
    let mut rows = MemoryRowSink::default();
    let mut errors = MemoryErrorSink::default();

    let summary = run_batch(&docs, &test_config(), &client, &mut rows, &mut errors)
        .await
        .unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(errors.records.len(), 1);
    assert_eq!(errors.records[0].document, "document.pdf");
    assert_eq!(client.releases.load(Ordering::SeqCst), 0);
}
