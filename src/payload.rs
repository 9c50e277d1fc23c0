//! Inbound request payload and outbound response envelope.
//!
//! These two types are the relay's public contract: a JSON body carrying a
//! base64 document plus options in, a JSON envelope carrying the signed
//! URL, raw OCR pages, and optional answer out. Field names are camelCase
//! on the wire. The envelope deliberately carries the *raw* engine pages —
//! display consumers run them through [`crate::normalize`] (or call
//! [`OcrResponsePayload::display_pages`]) so the untrusted → trusted
//! boundary stays in one place.

use crate::api::types::OcrResult;
use crate::normalize::{normalize, DisplayPage};
use crate::selection::PageSelection;
use serde::{Deserialize, Serialize};

/// File name used when the request does not carry one.
pub const DEFAULT_FILE_NAME: &str = "document.pdf";

/// An inbound OCR request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OcrRequest {
    /// The document content, base64-encoded. Required.
    pub file_base64: String,

    /// Original file name; defaults to [`DEFAULT_FILE_NAME`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,

    /// Ask the engine to inline extracted images as base64.
    pub include_image_base64: bool,

    /// Page restriction. Serialized as an optional array of positive
    /// 1-based page numbers; anything else normalizes to "all pages".
    #[serde(
        with = "crate::selection::wire",
        skip_serializing_if = "PageSelection::is_all"
    )]
    pub pages: PageSelection,

    /// Optional natural-language question to answer from the document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

impl OcrRequest {
    /// Effective file name: the trimmed supplied name, or the default.
    pub fn effective_file_name(&self) -> &str {
        self.file_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_FILE_NAME)
    }
}

/// The relay's success envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrResponsePayload {
    /// Time-limited signed URL of the uploaded document.
    pub document_url: String,

    /// The engine's OCR result, raw pages included.
    pub ocr: OcrResult,

    /// Answer to the request's `query`, when one was asked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,

    /// OCR model that processed the document.
    pub model: String,

    /// Chat model that produced `answer`, when one was asked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qa_model: Option<String>,
}

impl OcrResponsePayload {
    /// The OCR pages normalized for display.
    pub fn display_pages(&self) -> Vec<DisplayPage> {
        normalize(&self.ocr.pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_decodes_with_defaults() {
        let request: OcrRequest =
            serde_json::from_value(json!({"fileBase64": "JVBERi0="})).unwrap();
        assert_eq!(request.file_base64, "JVBERi0=");
        assert_eq!(request.effective_file_name(), "document.pdf");
        assert!(!request.include_image_base64);
        assert!(request.pages.is_all());
        assert!(request.query.is_none());
    }

    #[test]
    fn request_decodes_full_payload() {
        let request: OcrRequest = serde_json::from_value(json!({
            "fileBase64": "JVBERi0=",
            "fileName": "report.pdf",
            "includeImageBase64": true,
            "pages": [2, 1, 2],
            "query": "What is the total?",
        }))
        .unwrap();
        assert_eq!(request.effective_file_name(), "report.pdf");
        assert!(request.include_image_base64);
        assert_eq!(request.pages.as_pages(), Some(&[1, 2][..]));
        assert_eq!(request.query.as_deref(), Some("What is the total?"));
    }

    #[test]
    fn non_array_pages_normalize_to_all() {
        let request: OcrRequest = serde_json::from_value(json!({
            "fileBase64": "JVBERi0=",
            "pages": "1,2,3",
        }))
        .unwrap();
        assert!(request.pages.is_all());
    }

    #[test]
    fn blank_file_name_falls_back() {
        let request = OcrRequest {
            file_name: Some("   ".into()),
            ..OcrRequest::default()
        };
        assert_eq!(request.effective_file_name(), "document.pdf");
    }

    #[test]
    fn request_roundtrips_camel_case() {
        let request = OcrRequest {
            file_base64: "AA==".into(),
            file_name: Some("x.pdf".into()),
            include_image_base64: false,
            pages: PageSelection::from_pages([3, 1]),
            query: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["fileBase64"], "AA==");
        assert_eq!(value["fileName"], "x.pdf");
        assert_eq!(value["pages"], json!([1, 3]));
        assert!(value.get("query").is_none());
    }

    #[test]
    fn envelope_roundtrips_and_normalizes() {
        let envelope: OcrResponsePayload = serde_json::from_value(json!({
            "documentUrl": "https://signed.example/doc",
            "ocr": {
                "pages": [{"index": 0, "markdown": "Hello"}],
                "model": "mistral-ocr-2505",
            },
            "model": "mistral-ocr-latest",
            "qaModel": "mistral-small-latest",
            "answer": "42",
        }))
        .unwrap();
        let pages = envelope.display_pages();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].page_number, 1);
        assert_eq!(pages[0].markdown, "Hello");

        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["documentUrl"], "https://signed.example/doc");
        assert_eq!(value["qaModel"], "mistral-small-latest");
    }
}
