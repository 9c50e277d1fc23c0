//! Wire types for the document-intelligence engine.
//!
//! Request bodies are fully typed — we control what we send. Response
//! bodies are modelled defensively: the engine's output shape drifts, so
//! response fields are optional and the OCR page list decodes leniently
//! (see [`crate::normalize`]), leaving "is this usable?" decisions to the
//! client methods rather than the deserializer.

use crate::normalize::{lenient_pages, RawOcrPage};
use serde::{Deserialize, Serialize};

// ── Responses ────────────────────────────────────────────────────────────

/// Response to a document upload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileUploadResponse {
    /// Engine-assigned file id, exchanged later for a signed URL.
    pub id: Option<String>,
    pub filename: Option<String>,
    pub size_bytes: Option<u64>,
}

/// Response to a signed-URL request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SignedUrlResponse {
    pub url: Option<String>,
}

/// The engine's OCR envelope: pages plus the model that produced them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OcrResult {
    /// Raw pages; a missing or non-array field decodes to an empty list.
    #[serde(deserialize_with = "lenient_pages")]
    pub pages: Vec<RawOcrPage>,
    /// Model identifier the engine reports having used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<OcrUsage>,
}

/// Engine-reported OCR usage accounting.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OcrUsage {
    pub pages_processed: Option<u32>,
    pub doc_size_bytes: Option<u64>,
}

/// Chat-completion response (document Q&A).
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChatChoice {
    pub message: ChatMessageOut,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChatMessageOut {
    pub content: Option<String>,
}

// ── Requests ─────────────────────────────────────────────────────────────

/// Body of the OCR call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrCallRequest<'a> {
    pub model: &'a str,
    pub document: DocumentRef<'a>,
    /// 0-based page indices; omitted means all pages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<&'a [u32]>,
    pub include_image_base64: bool,
}

/// How the engine should locate the document.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DocumentRef<'a> {
    #[serde(rename_all = "camelCase")]
    DocumentUrl { document_url: &'a str },
}

/// Body of the chat-completion call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatCallRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    pub max_tokens: usize,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'a str,
    pub content: Vec<ContentPart<'a>>,
}

/// One part of a multimodal chat message.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart<'a> {
    #[serde(rename_all = "camelCase")]
    DocumentUrl { document_url: &'a str },
    Text { text: &'a str },
}
