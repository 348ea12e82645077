//! Configuration for a batch extraction run.
//!
//! Everything a run needs travels in one immutable [`ExtractionConfig`]
//! threaded from the batch driver down into each component call — the field
//! schema, the currency and singleton subsets (inside
//! [`crate::schema::FieldSchema`]), the retry bound, the prompt override.
//! Nothing is ambient: two runs with equal configs behave identically.
//!
//! # Design choice: builder over constructor
//! Callers set only what they care about and rely on documented defaults for
//! the rest; `build()` validates the result.

use crate::error::ExtractError;
use crate::progress::ProgressCallback;
use crate::schema::FieldSchema;
use std::fmt;

/// Configuration for a PDF-to-rows extraction run.
///
/// Built via [`ExtractionConfig::builder()`] or [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf2rows::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .model("gemini-2.5-flash")
///     .max_attempts(3)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Model identifier passed to the provider. Default: `gemini-2.5-flash`.
    ///
    /// The cheap flash tier reads these single-layout forms reliably; only
    /// move up a tier for degraded scans.
    pub model: String,

    /// API key for the model provider. If `None`, the client falls back to
    /// the `GEMINI_API_KEY` environment variable.
    pub api_key: Option<String>,

    /// Extraction schema: ordered field list plus the currency-bearing and
    /// singleton-designated subsets. Default: [`FieldSchema::tax_notice`].
    pub schema: FieldSchema,

    /// Total attempts per document (upload + call + parse). Default: 3.
    ///
    /// The model call is the expensive step; three attempts catch the usual
    /// transient 5xx errors and one-off malformed responses without holding a
    /// failing document hostage for minutes.
    pub max_attempts: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    ///
    /// Doubles per attempt: 500 ms → 1 s. Keeps a recovering API endpoint
    /// from being hammered the instant it starts failing.
    pub retry_backoff_ms: u64,

    /// Per-HTTP-call timeout in seconds. Default: 120.
    ///
    /// Uploads of multi-megabyte scans plus model inference over a whole
    /// document routinely take tens of seconds.
    pub api_timeout_secs: u64,

    /// Custom extraction prompt. If `None`, one is generated from the schema
    /// by [`crate::prompts::build_extraction_prompt`].
    pub prompt: Option<String>,

    /// Optional per-document progress events for UIs.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            api_key: None,
            schema: FieldSchema::tax_notice(),
            max_attempts: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 120,
            prompt: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("schema_fields", &self.schema.len())
            .field("max_attempts", &self.max_attempts)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("prompt", &self.prompt.as_ref().map(|p| p.len()))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn schema(mut self, schema: FieldSchema) -> Self {
        self.config.schema = schema;
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n.max(1);
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = Some(prompt.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if c.max_attempts == 0 {
            return Err(ExtractError::InvalidConfig("max_attempts must be ≥ 1".into()));
        }
        if c.model.trim().is_empty() {
            return Err(ExtractError::InvalidConfig("model must not be empty".into()));
        }
        Ok(self.config)
    }
}
