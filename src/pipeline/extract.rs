//! Bounded retry around one document's upload → model call → parse cycle.
//!
//! ## Attempt lifecycle
//!
//! ```text
//! Uploading ──▶ Requesting ──▶ Parsing ──▶ Success
//!     │             │             │
//!     └─────────────┴─────────────┴──▶ Retryable (next attempt or terminal)
//! ```
//!
//! Every attempt that acquired an uploaded-document handle releases it before
//! the attempt ends — success, parse failure, or transport failure alike. The
//! uploaded artifact is a billable, quota-limited remote resource; leaking it
//! across a long batch run would accumulate until the provider starts
//! rejecting uploads.
//!
//! Parse failures and transport failures are both retryable while attempts
//! remain: the model call is an expensive, occasionally flaky network
//! operation, and a second attempt frequently produces well-formed JSON where
//! the first rambled. Once the bound is exhausted the last failure is
//! surfaced as [`DocumentError::RetriesExhausted`] carrying the last raw
//! response text for diagnosis.

use crate::config::ExtractionConfig;
use crate::error::DocumentError;
use crate::model::ModelClient;
use crate::pipeline::parse;
use serde_json::Value;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// A successful extraction: the parsed records plus the raw response they
/// came from and how many attempts it took.
#[derive(Debug)]
pub struct Extraction {
    pub records: Vec<Value>,
    pub raw_response: String,
    pub attempts: u32,
}

/// Outcome of a single attempt. The loop over these is the whole retry
/// policy — no exception unwinding, no hidden state.
enum AttemptOutcome {
    Success { records: Vec<Value>, raw: String },
    Retryable { detail: String, raw: Option<String> },
}

/// Run the upload → generate → parse round trip under the retry bound.
pub async fn extract_records(
    client: &dyn ModelClient,
    bytes: &[u8],
    display_name: &str,
    prompt: &str,
    config: &ExtractionConfig,
) -> Result<Extraction, DocumentError> {
    let mut last_detail = String::new();
    let mut last_raw: Option<String> = None;

    for attempt in 1..=config.max_attempts {
        if attempt > 1 {
            // Exponent clamped so large attempt budgets can't overflow the
            // shift; the multiply saturates rather than panicking.
            let backoff = config
                .retry_backoff_ms
                .saturating_mul(2u64.saturating_pow((attempt - 2).min(16)));
            warn!(
                "'{}': attempt {}/{} after {}ms backoff",
                display_name, attempt, config.max_attempts, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match run_attempt(client, bytes, display_name, prompt).await {
            AttemptOutcome::Success { records, raw } => {
                debug!(
                    "'{}': extracted {} records on attempt {}",
                    display_name,
                    records.len(),
                    attempt
                );
                return Ok(Extraction {
                    records,
                    raw_response: raw,
                    attempts: attempt,
                });
            }
            AttemptOutcome::Retryable { detail, raw } => {
                warn!("'{}': attempt {} failed — {}", display_name, attempt, detail);
                last_detail = detail;
                if raw.is_some() {
                    last_raw = raw;
                }
            }
        }
    }

    Err(DocumentError::RetriesExhausted {
        attempts: config.max_attempts,
        last_error: last_detail,
        raw_response: last_raw,
    })
}

/// One complete upload-call-parse cycle, with guaranteed release of the
/// uploaded handle on every exit path past the upload.
async fn run_attempt(
    client: &dyn ModelClient,
    bytes: &[u8],
    display_name: &str,
    prompt: &str,
) -> AttemptOutcome {
    // Uploading. No handle exists yet on failure, so nothing to release.
    let document = match client.upload(bytes, display_name).await {
        Ok(doc) => doc,
        Err(e) => {
            return AttemptOutcome::Retryable {
                detail: e.to_string(),
                raw: None,
            }
        }
    };

    // Requesting + Parsing, with the handle held.
    let outcome = match client.generate(&document, prompt).await {
        Ok(raw) => match parse::parse_records(&raw) {
            Ok(records) => AttemptOutcome::Success { records, raw },
            Err(e) => AttemptOutcome::Retryable {
                detail: e.to_string(),
                raw: Some(raw),
            },
        },
        Err(e) => AttemptOutcome::Retryable {
            detail: e.to_string(),
            raw: None,
        },
    };

    // Release before the outcome is acted on. A failed delete is logged, not
    // escalated: the file expires server-side and must not mask the real
    // outcome of the attempt.
    if let Err(e) = client.release(&document).await {
        warn!("'{}': {}", display_name, e);
    }

    outcome
}
