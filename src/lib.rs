//! # pdf2rows
//!
//! Extract structured field data from scanned tax-document PDFs using a
//! vision-capable language model, and reconcile the results into tabular
//! rows.
//!
//! ## Why this crate?
//!
//! Tax guidance notices mix one multi-row business-income table with
//! single-occurrence fields scattered across the page. Traditional OCR gives
//! you text soup; asking a vision model for JSON gives you *almost*
//! structured data — prose-wrapped payloads, missing fields, currency
//! strings like `"1,234,000원"`, and singletons present only in the first
//! row. This crate is the reconciliation machinery around the model call:
//! JSON recovery, schema normalisation, currency cleaning, singleton
//! merging, bounded retries with guaranteed release of the uploaded file,
//! and a batch loop that never lets one bad document kill the run.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF folder
//!  │
//!  ├─ 1. Batch    iterate documents sequentially, accumulate counters
//!  ├─ 2. Extract  upload → model call → parse, ≤3 attempts, handle released
//!  │              after every attempt
//!  ├─ 3. Parse    recover JSON from prose / fences / bare spans
//!  ├─ 4. Normalise fill missing fields with "N/A", flatten line breaks
//!  ├─ 5. Merge    copy document-wide singletons into every income row
//!  └─ 6. Rows     schema-ordered cells, digit-only currency → CSV sink
//!                 (failures → separate CSV error trail)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2rows::{
//!     batch, sink::{CsvErrorSink, CsvRowSink}, ExtractionConfig, GeminiClient,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key from GEMINI_API_KEY
//!     let config = ExtractionConfig::default();
//!     let client = GeminiClient::new(None, &config.model, config.api_timeout_secs)?;
//!
//!     let documents = batch::list_documents("./pdfs")?;
//!     let mut rows = CsvRowSink::open("extracted.csv")?;
//!     let mut errors = CsvErrorSink::open("errors.csv")?;
//!
//!     let summary = batch::run_batch(&documents, &config, &client, &mut rows, &mut errors).await?;
//!     eprintln!(
//!         "{}/{} documents, {} rows",
//!         summary.succeeded, summary.documents, summary.rows_written
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2rows` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf2rows = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod record;
pub mod schema;
pub mod sink;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{list_documents, run_batch};
pub use config::{ExtractionConfig, ExtractionConfigBuilder};
pub use error::{DocumentError, ExtractError, SinkError};
pub use model::{GeminiClient, ModelClient, TransportError, UploadedDocument};
pub use progress::{BatchProgressCallback, ProgressCallback};
pub use record::{BatchSummary, ErrorRecord, RawRecord};
pub use schema::{FieldSchema, SENTINEL};
