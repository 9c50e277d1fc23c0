//! # docrelay
//!
//! Relay PDF documents to a document-intelligence API and get back
//! structured OCR output — and, optionally, an answer to a question
//! grounded in the document.
//!
//! ## Why this crate?
//!
//! Document-intelligence engines are easy to call and awkward to consume:
//! the request dance is upload → sign → OCR → (optionally) chat, and the
//! response shape is loose — page numbers come 1-based, 0-based, or not at
//! all, block arrays contain `null` holes, markdown may be missing
//! entirely. This crate owns both halves: a thin relay that drives the
//! engine, and a total normalization layer that turns whatever comes back
//! into a display model with no absent fields.
//!
//! ## Pipeline Overview
//!
//! ```text
//! request (base64 PDF, pages?, query?)
//!  │
//!  ├─ 1. Validate  decode base64, enforce the upload cap
//!  ├─ 2. Upload    multipart to the engine's file store
//!  ├─ 3. Sign      exchange the file id for a time-limited URL
//!  ├─ 4. OCR       markdown + blocks per selected page
//!  ├─ 5. Answer    chat-completion grounded in the document (optional)
//!  └─ 6. Reshape   envelope out; normalize for display
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docrelay::{process, OcrRequest, PageSelection, RelayConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RelayConfig::builder()
//!         .api_key(std::env::var("MISTRAL_API_KEY")?)
//!         .build()?;
//!
//!     let request = OcrRequest {
//!         file_base64: std::fs::read("invoice.pdf")
//!             .map(|bytes| {
//!                 use base64::{engine::general_purpose::STANDARD, Engine as _};
//!                 STANDARD.encode(bytes)
//!             })?,
//!         pages: PageSelection::parse("1, 3-5"),
//!         query: Some("What is the invoice total?".into()),
//!         ..OcrRequest::default()
//!     };
//!
//!     let envelope = process(request, &config).await?;
//!     for page in envelope.display_pages() {
//!         println!("<!-- page {} -->\n{}", page.page_number, page.markdown);
//!     }
//!     if let Some(answer) = envelope.answer {
//!         println!("\nAnswer: {answer}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docrelay` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! docrelay = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod api;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod normalize;
pub mod payload;
pub mod relay;
pub mod selection;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use api::types::{OcrResult, OcrUsage};
pub use api::DocumentAiClient;
pub use config::{RelayConfig, RelayConfigBuilder, DEFAULT_MAX_UPLOAD_BYTES};
pub use endpoint::EndpointResolver;
pub use error::{RelayError, Stage};
pub use normalize::{normalize, BoundingBox, DisplayPage, OcrBlock, RawOcrPage};
pub use payload::{OcrRequest, OcrResponsePayload, DEFAULT_FILE_NAME};
pub use relay::{process, process_sync};
pub use selection::PageSelection;
