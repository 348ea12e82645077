//! Tabular and error sinks.
//!
//! The batch driver only knows the two traits: an append-only,
//! order-preserving [`RowSink`] for extracted rows and a logically separate
//! [`ErrorSink`] for the failure trail. The CSV implementations here are the
//! default transport; tests substitute in-memory sinks.
//!
//! Both CSV sinks open their file in append mode and write the header only
//! when the file is new or empty, so repeated runs accumulate rows under a
//! single header. Writers are flushed after every append — a crash mid-batch
//! loses at most the in-flight document, never rows already appended.

use crate::error::{ExtractError, SinkError};
use crate::record::ErrorRecord;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Append-only sink for extracted rows. No uniqueness constraint is enforced.
pub trait RowSink {
    /// Write `header` if the sink has no content yet. Called once per run,
    /// before any rows.
    fn ensure_header(&mut self, header: &[String]) -> Result<(), SinkError>;

    /// Append all of one document's rows in order, as one batched write.
    fn append_rows(&mut self, rows: &[Vec<String>]) -> Result<(), SinkError>;
}

/// Append-only sink for the error trail.
pub trait ErrorSink {
    fn append_error(&mut self, record: &ErrorRecord) -> Result<(), SinkError>;
}

const ERROR_HEADER: [&str; 3] = ["file_name", "error", "timestamp"];

// ── CSV implementations ──────────────────────────────────────────────────

/// CSV-backed [`RowSink`].
pub struct CsvRowSink {
    writer: csv::Writer<File>,
    needs_header: bool,
    path: PathBuf,
}

impl CsvRowSink {
    /// Open (or create) `path` for appending.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ExtractError> {
        let path = path.as_ref().to_path_buf();
        let (file, empty) = open_append(&path)?;
        Ok(Self {
            writer: csv::WriterBuilder::new().from_writer(file),
            needs_header: empty,
            path,
        })
    }
}

impl RowSink for CsvRowSink {
    fn ensure_header(&mut self, header: &[String]) -> Result<(), SinkError> {
        if self.needs_header {
            self.writer.write_record(header)?;
            self.writer.flush()?;
            self.needs_header = false;
            debug!("wrote header to {}", self.path.display());
        }
        Ok(())
    }

    fn append_rows(&mut self, rows: &[Vec<String>]) -> Result<(), SinkError> {
        for row in rows {
            self.writer.write_record(row)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// CSV-backed [`ErrorSink`]. The fixed three-column header is written on
/// first use of a new file.
pub struct CsvErrorSink {
    writer: csv::Writer<File>,
    needs_header: bool,
}

impl CsvErrorSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ExtractError> {
        let (file, empty) = open_append(path.as_ref())?;
        Ok(Self {
            writer: csv::WriterBuilder::new().from_writer(file),
            needs_header: empty,
        })
    }
}

impl ErrorSink for CsvErrorSink {
    fn append_error(&mut self, record: &ErrorRecord) -> Result<(), SinkError> {
        if self.needs_header {
            self.writer.write_record(ERROR_HEADER)?;
            self.needs_header = false;
        }
        self.writer.write_record(record.cells())?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Open `path` in append mode, reporting whether it is new/empty.
fn open_append(path: &Path) -> Result<(File, bool), ExtractError> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| ExtractError::SinkOpen {
            path: path.to_path_buf(),
            source,
        })?;
    let empty = file
        .metadata()
        .map(|m| m.len() == 0)
        .map_err(|source| ExtractError::SinkOpen {
            path: path.to_path_buf(),
            source,
        })?;
    Ok((file, empty))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn header_written_once_for_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.csv");

        let mut sink = CsvRowSink::open(&path).unwrap();
        sink.ensure_header(&strings(&["file_name", "row_index", "성명"])).unwrap();
        sink.append_rows(&[strings(&["doc.pdf", "1", "홍길동"])]).unwrap();
        drop(sink);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("file_name,row_index"));
        assert!(lines[1].contains("홍길동"));
    }

    #[test]
    fn reopened_file_keeps_single_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.csv");
        let header = strings(&["file_name", "row_index"]);

        for doc in ["a.pdf", "b.pdf"] {
            let mut sink = CsvRowSink::open(&path).unwrap();
            sink.ensure_header(&header).unwrap();
            sink.append_rows(&[strings(&[doc, "1"])]).unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("file_name").count(), 1);
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn cells_with_commas_are_quoted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.csv");

        let mut sink = CsvRowSink::open(&path).unwrap();
        sink.append_rows(&[strings(&["doc.pdf", "1", "1,234,000"])]).unwrap();
        drop(sink);

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .unwrap();
        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(&row[2], "1,234,000");
    }

    #[test]
    fn error_sink_writes_fixed_header_and_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("errors.csv");

        let mut sink = CsvErrorSink::open(&path).unwrap();
        sink.append_error(&ErrorRecord::new("doc.pdf", "boom")).unwrap();
        drop(sink);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "file_name,error,timestamp");
        assert!(lines[1].starts_with("doc.pdf,boom,"));
    }

    #[test]
    fn open_fails_for_missing_parent_dir() {
        let err = CsvRowSink::open("/nonexistent-dir/rows.csv");
        assert!(matches!(err, Err(ExtractError::SinkOpen { .. })));
    }
}
