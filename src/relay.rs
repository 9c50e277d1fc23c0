//! Request orchestration: validate the payload, drive the engine pipeline,
//! reshape the response.
//!
//! This is the relay's equivalent of a request handler — everything an
//! HTTP edge would do between "JSON body arrived" and "JSON envelope
//! leaves", minus the transport itself. Validation happens before any
//! network call so an oversized or empty payload costs nothing upstream.

use crate::api::DocumentAiClient;
use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::payload::{OcrRequest, OcrResponsePayload};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::time::Instant;
use tracing::{debug, info};

/// Process one OCR request end to end.
///
/// # Pipeline
/// 1. Validate and decode the base64 payload (size-capped).
/// 2. Upload the document to the engine's file store.
/// 3. Exchange the file id for a signed URL.
/// 4. OCR the signed document, restricted to the selected pages.
/// 5. Answer the request's question, when one was asked.
/// 6. Assemble the response envelope.
///
/// # Errors
/// Returns [`RelayError`] for unusable payloads, missing configuration,
/// and upstream failures. Malformed *content* inside a successful engine
/// response is not an error — it is normalized downstream
/// (see [`crate::normalize`]).
pub async fn process(
    request: OcrRequest,
    config: &RelayConfig,
) -> Result<OcrResponsePayload, RelayError> {
    let total_start = Instant::now();

    // ── Step 1: Validate payload ─────────────────────────────────────────
    let bytes = decode_file(&request.file_base64)?;
    if bytes.len() > config.max_upload_bytes {
        return Err(RelayError::FileTooLarge {
            size: bytes.len(),
            limit: config.max_upload_bytes,
        });
    }
    let file_name = request.effective_file_name().to_string();
    info!(%file_name, size = bytes.len(), "relaying document");

    let client = DocumentAiClient::new(config)?;

    // ── Step 2: Upload ───────────────────────────────────────────────────
    let file_id = client.upload(&file_name, bytes).await?;
    debug!(%file_id, "document stored");

    // ── Step 3: Signed URL ───────────────────────────────────────────────
    let document_url = client.signed_url(&file_id).await?;

    // ── Step 4: OCR ──────────────────────────────────────────────────────
    let zero_based = request.pages.to_zero_based();
    let ocr = client
        .ocr(
            &document_url,
            zero_based.as_deref(),
            request.include_image_base64,
        )
        .await?;

    // ── Step 5: Q&A ──────────────────────────────────────────────────────
    let query = request
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty());
    let answer = match query {
        Some(q) => Some(client.answer(&document_url, q).await?),
        None => None,
    };

    // ── Step 6: Envelope ─────────────────────────────────────────────────
    let model = ocr
        .model
        .clone()
        .unwrap_or_else(|| config.ocr_model.clone());
    let qa_model = answer.as_ref().map(|_| config.qa_model.clone());

    info!(
        pages = ocr.pages.len(),
        answered = answer.is_some(),
        duration_ms = total_start.elapsed().as_millis() as u64,
        "relay complete"
    );

    Ok(OcrResponsePayload {
        document_url,
        ocr,
        answer,
        model,
        qa_model,
    })
}

/// Synchronous wrapper around [`process`].
///
/// Creates a temporary tokio runtime internally.
pub fn process_sync(
    request: OcrRequest,
    config: &RelayConfig,
) -> Result<OcrResponsePayload, RelayError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| RelayError::InvalidConfig(format!("failed to create tokio runtime: {e}")))?
        .block_on(process(request, config))
}

/// Decode the request's base64 document content.
///
/// Tolerates the data-URI form browsers produce from `FileReader`
/// (`data:application/pdf;base64,JVBERi…`) by decoding only the part after
/// the last `base64,` marker.
fn decode_file(file_base64: &str) -> Result<Vec<u8>, RelayError> {
    let trimmed = file_base64.trim();
    if trimmed.is_empty() {
        return Err(RelayError::MissingFile);
    }
    let encoded = trimmed
        .rsplit_once("base64,")
        .map(|(_, tail)| tail)
        .unwrap_or(trimmed);
    STANDARD
        .decode(encoded)
        .map_err(|e| RelayError::InvalidBase64 {
            detail: e.to_string(),
        })
}
