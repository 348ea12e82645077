//! The model seam: upload a document, ask the model about it, release it.
//!
//! The extraction pipeline never talks HTTP directly — it drives a
//! [`ModelClient`], which keeps the retry orchestrator testable with a
//! scripted client and leaves the wire details to one implementation
//! ([`gemini::GeminiClient`]).
//!
//! ## Resource contract
//!
//! `upload` hands back an [`UploadedDocument`] handle for a **remote,
//! quota-limited** resource. Whoever holds the handle must call `release`
//! before the next attempt starts, on every exit path — the retry loop in
//! [`crate::pipeline::extract`] enforces this.

use async_trait::async_trait;
use thiserror::Error;

pub mod gemini;

pub use gemini::GeminiClient;

/// Handle to a document uploaded to the model provider's file store.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    /// Provider resource name, e.g. `files/abc-123`. Used for deletion.
    pub name: String,
    /// Provider URI referenced from the model request body.
    pub uri: String,
    /// MIME type registered at upload time.
    pub mime_type: String,
}

/// A transport-level failure from the model provider.
///
/// Every variant is retryable inside the retry bound; none is terminal on
/// its own.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("upload failed: {detail}")]
    Upload { detail: String },

    #[error("uploaded file '{name}' still {state} after {waited_ms}ms")]
    UploadNotReady {
        name: String,
        state: String,
        waited_ms: u64,
    },

    #[error("model call failed: {detail}")]
    Generate { detail: String },

    #[error("release failed for '{name}': {detail}")]
    Release { name: String, detail: String },
}

/// A vision-capable model provider with an explicit file lifecycle.
///
/// ```text
/// upload ──▶ generate ──▶ release
/// (bytes)    (prompt)     (always)
/// ```
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Upload raw document bytes; returns a handle once the provider has the
    /// file ready for inference.
    async fn upload(
        &self,
        bytes: &[u8],
        display_name: &str,
    ) -> Result<UploadedDocument, TransportError>;

    /// Ask the model to answer `prompt` against the uploaded document.
    /// Returns the raw response text, unparsed.
    async fn generate(
        &self,
        document: &UploadedDocument,
        prompt: &str,
    ) -> Result<String, TransportError>;

    /// Delete the uploaded document from the provider's file store.
    async fn release(&self, document: &UploadedDocument) -> Result<(), TransportError>;
}
