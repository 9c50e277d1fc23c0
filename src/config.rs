//! Configuration for the document relay.
//!
//! All relay behaviour is controlled through [`RelayConfig`], built via its
//! [`RelayConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share a config across requests and to diff two runs to
//! understand why their outputs differ.
//!
//! The pure core functions take explicit values — nothing in the library
//! reads the process environment. Environment lookups (`MISTRAL_API_KEY`,
//! `DOCRELAY_API_BASE`) happen only at the CLI edge.

use crate::endpoint::EndpointResolver;
use crate::error::RelayError;
use std::fmt;

/// Default upload cap: 4.5 MiB, matching the typical serverless request
/// body limit the relay is deployed behind.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 4_718_592;

/// Configuration for a relay run.
///
/// Built via [`RelayConfig::builder()`] or [`RelayConfig::default()`].
///
/// # Example
/// ```rust
/// use docrelay::RelayConfig;
///
/// let config = RelayConfig::builder()
///     .api_key("sk-…")
///     .ocr_model("mistral-ocr-latest")
///     .max_retries(1)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct RelayConfig {
    /// Base URL of the document-intelligence API. Default: `https://api.mistral.ai`.
    pub api_base: String,

    /// Bearer token for the engine. Required for any network call;
    /// the pure core functions never touch it.
    pub api_key: Option<String>,

    /// Hostname the calling context is served from, when observable.
    ///
    /// Feeds the loopback guard in [`EndpointResolver`]: a non-loopback
    /// origin is never allowed to resolve API calls onto loopback. `None`
    /// (the default for CLI and server use) skips the guard.
    pub origin_host: Option<String>,

    /// OCR model identifier. Default: `mistral-ocr-latest`.
    pub ocr_model: String,

    /// Chat model used for document Q&A. Default: `mistral-small-latest`.
    pub qa_model: String,

    /// Ask the engine to inline extracted images as base64. Default: false.
    ///
    /// Inlined images multiply response size by the page's image content;
    /// leave off unless the caller actually renders them.
    pub include_image_base64: bool,

    /// Maximum decoded upload size in bytes. Default: 4 718 592 (4.5 MiB).
    ///
    /// Oversized documents are rejected before any network call so a too
    /// large payload costs nothing upstream.
    pub max_upload_bytes: usize,

    /// Lifetime of the signed document URL in hours. Default: 24.
    pub signed_url_expiry_hours: u32,

    /// Per-API-call timeout in seconds (sign, OCR, answer). Default: 60.
    pub api_timeout_secs: u64,

    /// Upload timeout in seconds. Default: 120.
    ///
    /// Uploads move the whole document body and deserve more headroom than
    /// the JSON calls.
    pub upload_timeout_secs: u64,

    /// Maximum retry attempts on a transient engine failure. Default: 2.
    ///
    /// Most 5xx and timeout errors are transient. Permanent errors (bad
    /// API key, 400) are not retried — they surface immediately.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    ///
    /// Doubles after each attempt: 500 ms → 1 s → 2 s.
    pub retry_backoff_ms: u64,

    /// Maximum tokens the chat model may generate for an answer. Default: 1024.
    pub max_answer_tokens: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.mistral.ai".to_string(),
            api_key: None,
            origin_host: None,
            ocr_model: "mistral-ocr-latest".to_string(),
            qa_model: "mistral-small-latest".to_string(),
            include_image_base64: false,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            signed_url_expiry_hours: 24,
            api_timeout_secs: 60,
            upload_timeout_secs: 120,
            max_retries: 2,
            retry_backoff_ms: 500,
            max_answer_tokens: 1024,
        }
    }
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("origin_host", &self.origin_host)
            .field("ocr_model", &self.ocr_model)
            .field("qa_model", &self.qa_model)
            .field("include_image_base64", &self.include_image_base64)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("signed_url_expiry_hours", &self.signed_url_expiry_hours)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl RelayConfig {
    /// Create a new builder for `RelayConfig`.
    pub fn builder() -> RelayConfigBuilder {
        RelayConfigBuilder {
            config: Self::default(),
        }
    }

    /// Endpoint resolver for this config's base URL and origin.
    pub fn resolver(&self) -> EndpointResolver {
        EndpointResolver::new(Some(&self.api_base), self.origin_host.as_deref())
    }
}

/// Builder for [`RelayConfig`].
#[derive(Debug)]
pub struct RelayConfigBuilder {
    config: RelayConfig,
}

impl RelayConfigBuilder {
    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.config.api_base = base.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn origin_host(mut self, host: impl Into<String>) -> Self {
        self.config.origin_host = Some(host.into());
        self
    }

    pub fn ocr_model(mut self, model: impl Into<String>) -> Self {
        self.config.ocr_model = model.into();
        self
    }

    pub fn qa_model(mut self, model: impl Into<String>) -> Self {
        self.config.qa_model = model.into();
        self
    }

    pub fn include_image_base64(mut self, v: bool) -> Self {
        self.config.include_image_base64 = v;
        self
    }

    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.config.max_upload_bytes = bytes.max(1);
        self
    }

    pub fn signed_url_expiry_hours(mut self, hours: u32) -> Self {
        self.config.signed_url_expiry_hours = hours.clamp(1, 168);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn upload_timeout_secs(mut self, secs: u64) -> Self {
        self.config.upload_timeout_secs = secs.max(1);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn max_answer_tokens(mut self, n: usize) -> Self {
        self.config.max_answer_tokens = n.max(1);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RelayConfig, RelayError> {
        let c = &self.config;
        if c.api_base.trim().is_empty() {
            return Err(RelayError::InvalidConfig(
                "api_base must not be empty".into(),
            ));
        }
        if c.ocr_model.trim().is_empty() || c.qa_model.trim().is_empty() {
            return Err(RelayError::InvalidConfig(
                "model identifiers must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = RelayConfig::default();
        assert_eq!(config.max_upload_bytes, 4_718_592);
        assert_eq!(config.signed_url_expiry_hours, 24);
        assert!(!config.include_image_base64);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn builder_clamps_and_overrides() {
        let config = RelayConfig::builder()
            .api_key("k")
            .signed_url_expiry_hours(10_000)
            .max_upload_bytes(0)
            .max_retries(5)
            .build()
            .unwrap();
        assert_eq!(config.signed_url_expiry_hours, 168);
        assert_eq!(config.max_upload_bytes, 1);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.api_key.as_deref(), Some("k"));
    }

    #[test]
    fn empty_base_rejected() {
        let err = RelayConfig::builder().api_base("  ").build().unwrap_err();
        assert!(matches!(err, RelayError::InvalidConfig(_)));
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = RelayConfig::builder().api_key("super-secret").build().unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
