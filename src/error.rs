//! Error types for the docrelay library.
//!
//! Everything here is a *relay* failure: the inbound payload was unusable,
//! the configuration is incomplete, or the upstream document-intelligence
//! engine rejected a call. Malformed data inside an otherwise valid engine
//! response is NOT an error — the normalizer maps it to safe defaults
//! (see [`crate::normalize`]), so callers never lose a whole document to a
//! single odd field.
//!
//! Each API-facing variant carries the [`Stage`] of the upload → sign →
//! OCR → answer pipeline it occurred in, so an operator reading a log line
//! can tell *which* upstream call failed without cross-referencing traces.

use thiserror::Error;

/// Pipeline stage an upstream API error occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Multipart upload of the document to the engine's file store.
    Upload,
    /// Exchange of the stored file id for a time-limited signed URL.
    Sign,
    /// The OCR call against the signed document URL.
    Ocr,
    /// The chat-completion call answering the user's question.
    Answer,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Stage::Upload => "upload",
            Stage::Sign => "signed-url",
            Stage::Ocr => "ocr",
            Stage::Answer => "answer",
        })
    }
}

/// All errors returned by the docrelay library.
#[derive(Debug, Error)]
pub enum RelayError {
    // ── Payload errors ────────────────────────────────────────────────────
    /// The request carried no document content.
    #[error("Request contains no document: 'fileBase64' is empty.\nEncode the PDF bytes as base64 and retry.")]
    MissingFile,

    /// The document content was present but not decodable base64.
    #[error("Document payload is not valid base64: {detail}")]
    InvalidBase64 { detail: String },

    /// The decoded document exceeds the configured upload cap.
    #[error("Document is too large: {size} bytes (limit {limit} bytes).\nSplit the PDF or raise RelayConfig::max_upload_bytes.")]
    FileTooLarge { size: usize, limit: usize },

    // ── Config errors ─────────────────────────────────────────────────────
    /// No API key was provided for the upstream engine.
    #[error("No API key configured for the document engine.\nSet MISTRAL_API_KEY or provide RelayConfig::api_key.")]
    MissingApiKey,

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Upstream API errors ───────────────────────────────────────────────
    /// The engine rejected the credentials (401/403) — retry will not help.
    #[error("Authentication rejected during {stage}: {detail}\nCheck that the API key is valid and not expired.")]
    AuthRejected { stage: Stage, detail: String },

    /// The engine returned HTTP 429 — caller should back off.
    ///
    /// Check `retry_after_secs` for a server-specified delay, or use
    /// exponential backoff if `None`.
    #[error("Rate limit exceeded during {stage}")]
    RateLimited {
        stage: Stage,
        retry_after_secs: Option<u64>,
    },

    /// Any other non-2xx status from the engine.
    #[error("Engine returned HTTP {status} during {stage}: {detail}")]
    ApiStatus {
        stage: Stage,
        status: u16,
        detail: String,
    },

    /// The HTTP call itself failed (connect, TLS, timeout).
    #[error("Network failure during {stage}: {source}")]
    Transport {
        stage: Stage,
        #[source]
        source: reqwest::Error,
    },

    /// The engine answered 2xx but the body was missing required fields.
    #[error("Unexpected engine response during {stage}: {detail}")]
    UnexpectedResponse { stage: Stage, detail: String },
}

impl RelayError {
    /// Whether a retry with backoff has a reasonable chance of succeeding.
    ///
    /// 429 and 5xx responses and connection-level failures are transient
    /// under load; auth errors and malformed payloads are not.
    pub fn is_transient(&self) -> bool {
        match self {
            RelayError::RateLimited { .. } => true,
            RelayError::ApiStatus { status, .. } => (500..=599).contains(status),
            RelayError::Transport { source, .. } => source.is_timeout() || source.is_connect(),
            _ => false,
        }
    }
}
