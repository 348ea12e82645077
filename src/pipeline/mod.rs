//! Pipeline stages for structured extraction.
//!
//! Each submodule implements exactly one transformation step, independently
//! testable with plain values — no network and no sinks below `extract`.
//!
//! ## Data Flow
//!
//! ```text
//! extract ──▶ parse ──▶ normalize ──▶ merge ──▶ rows
//! (retry)     (JSON     (schema       (single-  (string
//!              recovery)  fill)        tons)     cells)
//! ```
//!
//! 1. [`extract`]   — drive the upload/call/parse round trip under the retry
//!    bound, releasing the uploaded handle after every attempt
//! 2. [`parse`]     — recover a JSON array/object from free-form response text
//! 3. [`normalize`] — drop non-object elements, fill missing schema fields,
//!    flatten embedded line breaks
//! 4. [`merge`]     — overlay document-wide singleton values onto each row
//! 5. [`rows`]      — schema-ordered string cells, currency cleaning
//!    ([`clean`]), document-id and row-index columns

pub mod clean;
pub mod extract;
pub mod merge;
pub mod normalize;
pub mod parse;
pub mod rows;
