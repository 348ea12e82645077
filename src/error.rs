//! Error types for the pdf2rows library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ExtractError`] — **Fatal**: the batch cannot run at all (missing
//!   folder, invalid schema/config, sink could not be opened). Returned as
//!   `Err(ExtractError)` from the top-level entry points.
//!
//! * [`DocumentError`] — **Non-fatal**: a single document failed (the model
//!   never produced recoverable JSON, transport errors exhausted the retry
//!   bound, the sink rejected its rows) but the rest of the batch is fine.
//!   Converted into an [`crate::record::ErrorRecord`] on the error trail so
//!   the batch keeps going.
//!
//! The separation lets the batch driver guarantee its core contract: one bad
//! document never aborts the run.

use crate::model::TransportError;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2rows library.
///
/// Per-document failures use [`DocumentError`] and land on the error trail
/// rather than propagating here.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Document folder was not found at the given path.
    #[error("document folder not found: '{path}'\nCheck the path exists and is readable.")]
    FolderNotFound { path: PathBuf },

    /// Could not enumerate the document folder.
    #[error("failed to read document folder '{path}': {source}")]
    FolderRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder or schema validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Could not read a schema file from disk.
    #[error("failed to read schema file '{path}': {source}")]
    SchemaRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No API key was supplied and none was found in the environment.
    #[error("no API key configured for the model client.\nSet GEMINI_API_KEY or pass --api-key.")]
    MissingApiKey,

    // ── Sink errors ───────────────────────────────────────────────────────
    /// A sink could not be opened or created.
    #[error("failed to open sink '{path}': {source}")]
    SinkOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single document.
///
/// Mirrors the failure taxonomy of the pipeline: parse, transport,
/// validation, and sink failures, plus the terminal retries-exhausted case
/// produced by the retry loop in [`crate::pipeline::extract`].
#[derive(Debug, Error)]
pub enum DocumentError {
    /// No recoverable JSON value found in the model response.
    ///
    /// Retryable inside the retry bound; terminal afterward (surfaced via
    /// [`DocumentError::RetriesExhausted`] carrying the raw response).
    #[error("no JSON payload recovered from model response ({response_len} chars)")]
    Parse { response_len: usize },

    /// The upload, model call, or release call failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A record could not be coerced to the schema.
    ///
    /// Reserved for stricter deployments; the current normaliser degrades
    /// gracefully (drops bad elements, fills missing fields) instead.
    #[error("record rejected by schema validation: {detail}")]
    Validation { detail: String },

    /// The tabular or error sink rejected a write.
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// The document could not be read from disk.
    #[error("failed to read document: {0}")]
    Read(#[from] std::io::Error),

    /// Every attempt inside the retry bound failed.
    ///
    /// `raw_response` carries the last model response text (when one was
    /// received) so operators can diagnose what the model actually said.
    #[error("extraction failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        attempts: u32,
        last_error: String,
        raw_response: Option<String>,
    },
}

/// A write rejected by the tabular or error sink.
///
/// Never retried by the core; the batch driver converts it into an error
/// record (best-effort) and moves on.
#[derive(Debug, Error)]
#[error("sink write failed: {detail}")]
pub struct SinkError {
    pub detail: String,
}

impl From<csv::Error> for SinkError {
    fn from(e: csv::Error) -> Self {
        Self {
            detail: e.to_string(),
        }
    }
}

impl From<std::io::Error> for SinkError {
    fn from(e: std::io::Error) -> Self {
        Self {
            detail: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retries_exhausted_display() {
        let e = DocumentError::RetriesExhausted {
            attempts: 3,
            last_error: "model call failed: HTTP 503".into(),
            raw_response: None,
        };
        let msg = e.to_string();
        assert!(msg.contains("3 attempts"), "got: {msg}");
        assert!(msg.contains("HTTP 503"), "got: {msg}");
    }

    #[test]
    fn parse_error_display() {
        let e = DocumentError::Parse { response_len: 512 };
        assert!(e.to_string().contains("512"));
    }

    #[test]
    fn transport_error_is_transparent() {
        let e = DocumentError::Transport(TransportError::Generate {
            detail: "timeout".into(),
        });
        assert!(e.to_string().contains("timeout"));
    }

    #[test]
    fn missing_key_hint_mentions_env_var() {
        assert!(ExtractError::MissingApiKey.to_string().contains("GEMINI_API_KEY"));
    }
}
