//! Batch driver: iterate the document set, run the pipeline per document,
//! route failures to the error trail, and report aggregate counts.
//!
//! ## Failure containment
//!
//! The driver's core contract is that one bad document never aborts the
//! batch. Anything escaping a document's pipeline — exhausted retries, a
//! sink rejection, an unreadable file — becomes exactly one
//! [`ErrorRecord`] on the error trail, and the loop moves on. Writing the
//! error record is itself best-effort: if the error sink also fails, the
//! failure is logged for the operator and the document still counts as
//! failed.
//!
//! Documents are processed strictly one at a time. The model call dominates
//! latency and the sink is not proven safe under concurrent batched writes,
//! so there is nothing to win from fan-out here.

use crate::config::ExtractionConfig;
use crate::error::{DocumentError, ExtractError};
use crate::model::ModelClient;
use crate::pipeline::{extract, merge, normalize, rows};
use crate::prompts;
use crate::record::{BatchSummary, ErrorRecord};
use crate::sink::{ErrorSink, RowSink};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// List the PDF documents in `folder`, sorted by file name.
///
/// An empty result is a reported, non-fatal condition — the caller decides
/// whether an empty batch is worth running.
pub fn list_documents(folder: impl AsRef<Path>) -> Result<Vec<PathBuf>, ExtractError> {
    let folder = folder.as_ref();
    if !folder.is_dir() {
        return Err(ExtractError::FolderNotFound {
            path: folder.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(folder).map_err(|source| ExtractError::FolderRead {
        path: folder.to_path_buf(),
        source,
    })?;

    let mut documents: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .collect();
    documents.sort();

    if documents.is_empty() {
        info!("no PDF documents found in '{}'", folder.display());
    }
    Ok(documents)
}

/// Process every document in order, appending rows to `sink` and failures to
/// `errors`.
///
/// Returns `Err` only for conditions that prevent the batch from running at
/// all (the row sink rejecting its header); per-document failures are
/// absorbed into the returned [`BatchSummary`].
pub async fn run_batch(
    documents: &[PathBuf],
    config: &ExtractionConfig,
    client: &dyn ModelClient,
    sink: &mut dyn RowSink,
    errors: &mut dyn ErrorSink,
) -> Result<BatchSummary, ExtractError> {
    let prompt = config
        .prompt
        .clone()
        .unwrap_or_else(|| prompts::build_extraction_prompt(&config.schema));

    sink.ensure_header(&rows::header(&config.schema))
        .map_err(|e| ExtractError::Internal(format!("row sink header: {e}")))?;

    let total = documents.len();
    let mut summary = BatchSummary {
        documents: total,
        ..BatchSummary::default()
    };

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    for (i, path) in documents.iter().enumerate() {
        let index = i + 1;
        let name = display_name(path);
        info!("processing {}/{}: '{}'", index, total, name);

        if let Some(ref cb) = config.progress_callback {
            cb.on_document_start(index, total, &name);
        }

        let outcome = process_document(path, &name, &prompt, config, client).await;

        match outcome {
            Ok(document_rows) if document_rows.is_empty() => {
                // Valid terminal state: the income table was empty. Noted on
                // the error trail so the operator sees why the sheet gained
                // nothing, but counted as a success.
                info!("'{}' produced no rows", name);
                record_error(errors, &name, "no valid records extracted");
                summary.succeeded += 1;
                if let Some(ref cb) = config.progress_callback {
                    cb.on_document_complete(index, total, &name, 0);
                }
            }
            Ok(document_rows) => match sink.append_rows(&document_rows) {
                Ok(()) => {
                    info!("'{}': appended {} rows", name, document_rows.len());
                    summary.succeeded += 1;
                    summary.rows_written += document_rows.len();
                    if let Some(ref cb) = config.progress_callback {
                        cb.on_document_complete(index, total, &name, document_rows.len());
                    }
                }
                Err(e) => {
                    fail_document(
                        &mut summary,
                        errors,
                        config,
                        index,
                        total,
                        &name,
                        &DocumentError::Sink(e),
                    );
                }
            },
            Err(e) => {
                fail_document(&mut summary, errors, config, index, total, &name, &e);
            }
        }
    }

    info!(
        "batch complete: {} documents, {} succeeded, {} failed, {} rows",
        summary.documents, summary.succeeded, summary.failed, summary.rows_written
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(&summary);
    }

    Ok(summary)
}

/// One document's full pipeline: read → extract (retried) → normalise →
/// merge singletons → build rows.
async fn process_document(
    path: &Path,
    name: &str,
    prompt: &str,
    config: &ExtractionConfig,
    client: &dyn ModelClient,
) -> Result<Vec<Vec<String>>, DocumentError> {
    let bytes = tokio::fs::read(path).await?;

    let extraction = extract::extract_records(client, &bytes, name, prompt, config).await?;
    let records = normalize::normalize_records(extraction.records, &config.schema);
    let singletons = merge::collect_singletons(&records, &config.schema);
    let merged = merge::merge_singletons(&singletons, records);

    Ok(rows::build_rows(name, &merged, &config.schema))
}

fn fail_document(
    summary: &mut BatchSummary,
    errors: &mut dyn ErrorSink,
    config: &ExtractionConfig,
    index: usize,
    total: usize,
    name: &str,
    error: &DocumentError,
) {
    warn!("'{}' failed: {}", name, error);
    if let DocumentError::RetriesExhausted {
        raw_response: Some(raw),
        ..
    } = error
    {
        // Keep the model's last words reachable for diagnosis without
        // flooding the error trail with them.
        warn!("'{}' last raw response ({} chars): {:.500}", name, raw.len(), raw);
    }

    summary.failed += 1;
    record_error(errors, name, &error.to_string());
    if let Some(ref cb) = config.progress_callback {
        cb.on_document_error(index, total, name, &error.to_string());
    }
}

/// Best-effort append to the error trail.
fn record_error(errors: &mut dyn ErrorSink, name: &str, detail: &str) {
    if let Err(e) = errors.append_error(&ErrorRecord::new(name, detail)) {
        error!("error trail write failed for '{}': {}", name, e);
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
