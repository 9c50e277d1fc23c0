//! End-to-end integration tests for docrelay.
//!
//! The live tests relay a real PDF from `./test_cases/` through the
//! document-intelligence API. They are gated behind the `E2E_ENABLED`
//! environment variable (and need `MISTRAL_API_KEY`) so they do not run in
//! CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 MISTRAL_API_KEY=… cargo test --test e2e -- --nocapture
//!
//! The structural tests at the bottom exercise the public API without any
//! network access and always run.

use docrelay::{process, OcrRequest, PageSelection, RelayConfig, RelayError};
use std::path::PathBuf;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

/// Skip this test unless E2E_ENABLED and MISTRAL_API_KEY are set *and*
/// a PDF exists at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        if std::env::var("MISTRAL_API_KEY").is_err() {
            println!("SKIP — MISTRAL_API_KEY not set");
            return;
        }
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP — test file not found: {}", p.display());
            return;
        }
        p
    }};
}

fn request_for(path: &std::path::Path) -> OcrRequest {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    let bytes = std::fs::read(path).expect("read test PDF");
    OcrRequest {
        file_base64: STANDARD.encode(bytes),
        file_name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned()),
        ..OcrRequest::default()
    }
}

fn live_config() -> RelayConfig {
    RelayConfig::builder()
        .api_key(std::env::var("MISTRAL_API_KEY").expect("gated on MISTRAL_API_KEY"))
        .max_retries(2)
        .build()
        .expect("valid config")
}

// ── Live relay tests (need API key) ──────────────────────────────────────────

/// Relay a small PDF end to end and sanity-check the envelope.
#[tokio::test]
async fn test_relay_sample_pdf() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("sample.pdf"));

    let envelope = process(request_for(&path), &live_config())
        .await
        .expect("relay should succeed");

    assert!(
        envelope.document_url.starts_with("http"),
        "signed URL should be absolute, got: {}",
        envelope.document_url
    );
    assert!(!envelope.ocr.pages.is_empty(), "OCR should return pages");
    assert!(!envelope.model.is_empty());
    assert!(envelope.answer.is_none(), "no query → no answer");
    assert!(envelope.qa_model.is_none());

    let pages = envelope.display_pages();
    assert_eq!(pages.len(), envelope.ocr.pages.len());
    for page in &pages {
        assert!(page.page_number >= 1);
    }
    println!(
        "relayed {} page(s), first page {} chars",
        pages.len(),
        pages.first().map(|p| p.markdown.len()).unwrap_or(0)
    );
}

/// Restrict the relay to page 1 only.
#[tokio::test]
async fn test_relay_page_restriction() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("sample.pdf"));

    let mut request = request_for(&path);
    request.pages = PageSelection::parse("1");

    let envelope = process(request, &live_config())
        .await
        .expect("relay should succeed");

    assert_eq!(
        envelope.ocr.pages.len(),
        1,
        "selection of one page should return one page"
    );
    assert_eq!(envelope.display_pages()[0].page_number, 1);
}

/// Ask a question grounded in the document.
#[tokio::test]
async fn test_relay_with_query() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("sample.pdf"));

    let mut request = request_for(&path);
    request.query = Some("Summarise this document in one sentence.".into());

    let envelope = process(request, &live_config())
        .await
        .expect("relay should succeed");

    let answer = envelope.answer.expect("query should produce an answer");
    assert!(!answer.trim().is_empty());
    assert!(envelope.qa_model.is_some());
    println!("answer: {answer}");
}

// ── Structural tests (no network, always run) ────────────────────────────────

#[test]
fn test_page_selection_public_api() {
    assert!(PageSelection::parse("").is_all());
    assert_eq!(
        PageSelection::parse("1, 3-5, 8").as_pages(),
        Some(&[1, 3, 4, 5, 8][..])
    );
    assert!(PageSelection::parse("0-2").is_all());
    assert_eq!(
        PageSelection::parse("5-2, 8").to_zero_based(),
        Some(vec![7])
    );
}

#[test]
fn test_resolver_public_api() {
    use docrelay::EndpointResolver;

    let unguarded = EndpointResolver::new(None, None);
    assert_eq!(unguarded.resolve("/v1/ocr"), "/v1/ocr");

    let guarded = EndpointResolver::new(Some("http://localhost:3000"), Some("app.example.com"));
    assert_eq!(guarded.resolve("/v1/ocr"), "/v1/ocr");

    let public = EndpointResolver::new(Some("https://api.example.com"), Some("app.example.com"));
    assert_eq!(public.resolve("/v1/ocr"), "https://api.example.com/v1/ocr");
}

#[test]
fn test_envelope_json_round_trip() {
    use docrelay::OcrResponsePayload;

    let envelope: OcrResponsePayload = serde_json::from_value(serde_json::json!({
        "documentUrl": "https://signed.example/doc",
        "ocr": {
            "pages": [
                {"pageNumber": 5, "textBlocks": [null, {"type": "title", "text": "Hi"}]},
            ],
        },
        "model": "mistral-ocr-latest",
    }))
    .expect("envelope must deserialize");

    let pages = envelope.display_pages();
    assert_eq!(pages[0].page_number, 5);
    assert_eq!(pages[0].blocks.len(), 1);
    assert_eq!(pages[0].markdown, "# Hi");

    let json = serde_json::to_string_pretty(&envelope).expect("envelope must serialize");
    let back: OcrResponsePayload = serde_json::from_str(&json).expect("must round-trip");
    assert_eq!(back.ocr.pages.len(), envelope.ocr.pages.len());
}

#[tokio::test]
async fn test_validation_needs_no_network() {
    // An empty payload must fail before any client is even constructed —
    // the config here has no API key and no reachable base.
    let config = RelayConfig::builder()
        .api_base("https://definitely.invalid")
        .build()
        .expect("valid config");

    let err = process(OcrRequest::default(), &config)
        .await
        .expect_err("empty payload must be rejected");
    assert!(matches!(err, RelayError::MissingFile));
}

#[test]
fn test_missing_key_error_mentions_env_var() {
    // The error text is user-facing; it should say how to fix the problem.
    assert!(RelayError::MissingApiKey.to_string().contains("MISTRAL_API_KEY"));
}
