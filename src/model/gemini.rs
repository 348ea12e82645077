//! Gemini-backed [`ModelClient`]: File API upload + `generateContent`.
//!
//! ## Why the File API instead of inline bytes?
//!
//! Tax notices are scanned PDFs of several megabytes. Inlining them
//! base64-encoded into every `generateContent` request would resend the same
//! bytes on every retry and bump against request-size limits. Uploading once
//! per attempt and referencing the file URI keeps requests small; the
//! trade-off is that the uploaded file is a billable remote resource that
//! must be deleted afterwards — which is exactly the lifecycle
//! [`crate::pipeline::extract`] manages.
//!
//! The upload uses the documented resumable protocol (start → upload+finalize)
//! and then polls until the file leaves the `PROCESSING` state, since a
//! `generateContent` call against a still-processing file fails.

use super::{ModelClient, TransportError, UploadedDocument};
use crate::error::ExtractError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const PDF_MIME: &str = "application/pdf";

/// How long to wait for an uploaded file to become `ACTIVE`.
const ACTIVATION_TIMEOUT_MS: u64 = 30_000;
/// Poll interval while the file is `PROCESSING`.
const ACTIVATION_POLL_MS: u64 = 500;

/// Gemini model client over the REST API.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    /// Build a client for `model` (e.g. `gemini-2.5-flash`).
    ///
    /// `api_key` falls back to the `GEMINI_API_KEY` environment variable.
    pub fn new(
        api_key: Option<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, ExtractError> {
        let api_key = match api_key {
            Some(k) if !k.is_empty() => k,
            _ => std::env::var("GEMINI_API_KEY")
                .ok()
                .filter(|k| !k.is_empty())
                .ok_or(ExtractError::MissingApiKey)?,
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ExtractError::Internal(format!("http client: {e}")))?;

        Ok(Self {
            http,
            api_key,
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the client at a different endpoint (mock servers in tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn upload_start_url(&self) -> String {
        format!("{}/upload/v1beta/files", self.base_url)
    }

    fn file_url(&self, name: &str) -> String {
        // `name` is already of the form "files/abc-123".
        format!("{}/v1beta/{}", self.base_url, name)
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    /// Resumable-upload step 1: register the upload and get the session URL.
    async fn start_upload(
        &self,
        len: usize,
        display_name: &str,
    ) -> Result<String, TransportError> {
        let response = self
            .http
            .post(self.upload_start_url())
            .header("x-goog-api-key", &self.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", len.to_string())
            .header("X-Goog-Upload-Header-Content-Type", PDF_MIME)
            .json(&json!({ "file": { "display_name": display_name } }))
            .send()
            .await
            .map_err(|e| TransportError::Upload {
                detail: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(TransportError::Upload {
                detail: format!("HTTP {} on upload start", response.status()),
            });
        }

        response
            .headers()
            .get("X-Goog-Upload-URL")
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .ok_or_else(|| TransportError::Upload {
                detail: "upload start response missing X-Goog-Upload-URL header".into(),
            })
    }

    /// Resumable-upload step 2: send the bytes and finalize.
    async fn finish_upload(
        &self,
        session_url: &str,
        bytes: &[u8],
    ) -> Result<FileResource, TransportError> {
        let response = self
            .http
            .post(session_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| TransportError::Upload {
                detail: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(TransportError::Upload {
                detail: format!("HTTP {} on upload finalize", response.status()),
            });
        }

        let body: UploadResponse =
            response.json().await.map_err(|e| TransportError::Upload {
                detail: format!("malformed upload response: {e}"),
            })?;
        Ok(body.file)
    }

    /// Poll the file resource until it is `ACTIVE` (bounded).
    async fn wait_until_active(&self, file: FileResource) -> Result<FileResource, TransportError> {
        let mut file = file;
        let mut waited_ms = 0u64;

        while file.state.as_deref() == Some("PROCESSING") {
            if waited_ms >= ACTIVATION_TIMEOUT_MS {
                return Err(TransportError::UploadNotReady {
                    name: file.name,
                    state: "PROCESSING".into(),
                    waited_ms,
                });
            }
            tokio::time::sleep(Duration::from_millis(ACTIVATION_POLL_MS)).await;
            waited_ms += ACTIVATION_POLL_MS;

            let response = self
                .http
                .get(self.file_url(&file.name))
                .header("x-goog-api-key", &self.api_key)
                .send()
                .await
                .map_err(|e| TransportError::Upload {
                    detail: format!("file status poll: {e}"),
                })?;
            if !response.status().is_success() {
                return Err(TransportError::Upload {
                    detail: format!("HTTP {} on file status poll", response.status()),
                });
            }
            file = response
                .json()
                .await
                .map_err(|e| TransportError::Upload {
                    detail: format!("malformed file status: {e}"),
                })?;
        }

        match file.state.as_deref() {
            None | Some("ACTIVE") => Ok(file),
            Some(other) => Err(TransportError::UploadNotReady {
                name: file.name.clone(),
                state: other.to_string(),
                waited_ms,
            }),
        }
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn upload(
        &self,
        bytes: &[u8],
        display_name: &str,
    ) -> Result<UploadedDocument, TransportError> {
        info!("uploading '{}' ({} bytes)", display_name, bytes.len());
        let session_url = self.start_upload(bytes.len(), display_name).await?;
        let file = self.finish_upload(&session_url, bytes).await?;
        let file = self.wait_until_active(file).await?;
        debug!("upload ready: {} → {}", display_name, file.name);

        Ok(UploadedDocument {
            name: file.name,
            uri: file.uri,
            mime_type: file.mime_type.unwrap_or_else(|| PDF_MIME.to_string()),
        })
    }

    async fn generate(
        &self,
        document: &UploadedDocument,
        prompt: &str,
    ) -> Result<String, TransportError> {
        let body = json!({
            "contents": [{
                "parts": [
                    { "file_data": {
                        "mime_type": document.mime_type,
                        "file_uri": document.uri,
                    }},
                    { "text": prompt },
                ]
            }]
        });

        let response = self
            .http
            .post(self.generate_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::Generate {
                detail: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(TransportError::Generate {
                detail: format!("HTTP {status}: {}", truncate(&detail, 300)),
            });
        }

        let parsed: GenerateContentResponse =
            response.json().await.map_err(|e| TransportError::Generate {
                detail: format!("malformed model response: {e}"),
            })?;

        let text = parsed.first_text();
        if text.is_empty() {
            return Err(TransportError::Generate {
                detail: "model response contained no text parts".into(),
            });
        }
        debug!("model responded with {} chars", text.len());
        Ok(text)
    }

    async fn release(&self, document: &UploadedDocument) -> Result<(), TransportError> {
        let response = self
            .http
            .delete(self.file_url(&document.name))
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| TransportError::Release {
                name: document.name.clone(),
                detail: e.to_string(),
            })?;

        // 404 means the file already expired server-side; nothing leaked.
        if !response.status().is_success() && response.status().as_u16() != 404 {
            return Err(TransportError::Release {
                name: document.name.clone(),
                detail: format!("HTTP {}", response.status()),
            });
        }
        debug!("released {}", document.name);
        Ok(())
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: FileResource,
}

#[derive(Debug, Deserialize)]
struct FileResource {
    name: String,
    uri: String,
    state: Option<String>,
    #[serde(rename = "mimeType")]
    mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    fn first_text(&self) -> String {
        self.candidates
            .first()
            .map(|c| {
                c.content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}
