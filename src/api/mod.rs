//! HTTP client for the document-intelligence engine.
//!
//! Four calls, one per pipeline stage: multipart upload, signed-URL
//! exchange, OCR, and chat-completion Q&A. The client is deliberately
//! thin — request/response shapes live in [`types`], orchestration in
//! [`crate::relay`] — so retry and error mapping can change without
//! touching either.
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 5xx from the engine are transient and frequent under load.
//! Exponential backoff (`retry_backoff_ms * 2^attempt`) avoids
//! thundering-herd: with 500 ms base and 2 retries the wait sequence is
//! 500 ms → 1 s. Only the idempotent OCR and answer calls are retried;
//! re-sending an upload would duplicate the stored file.

pub mod types;

use crate::config::RelayConfig;
use crate::endpoint::EndpointResolver;
use crate::error::{RelayError, Stage};
use reqwest::{multipart, Response, StatusCode};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};
use types::{
    ChatCallRequest, ChatMessage, ChatResponse, ContentPart, DocumentRef, FileUploadResponse,
    OcrCallRequest, OcrResult, SignedUrlResponse,
};

/// Client for the upload → sign → OCR → answer endpoints.
#[derive(Clone)]
pub struct DocumentAiClient {
    http: reqwest::Client,
    resolver: EndpointResolver,
    api_key: String,
    config: RelayConfig,
}

impl std::fmt::Debug for DocumentAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentAiClient")
            .field("resolver", &self.resolver)
            .field("api_key", &"<redacted>")
            .field("config", &self.config)
            .finish()
    }
}

impl DocumentAiClient {
    /// Build a client from the relay configuration.
    ///
    /// Fails fast when no API key is configured — better here than as a
    /// 401 after the document has already been uploaded.
    pub fn new(config: &RelayConfig) -> Result<Self, RelayError> {
        let api_key = match &config.api_key {
            Some(key) if !key.trim().is_empty() => key.clone(),
            _ => return Err(RelayError::MissingApiKey),
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| RelayError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            resolver: config.resolver(),
            api_key,
            config: config.clone(),
        })
    }

    /// Upload the document to the engine's file store; returns the file id.
    pub async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, RelayError> {
        let url = self.resolver.resolve("/v1/files");
        debug!(file_name, size = bytes.len(), "uploading document");

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")
            .map_err(|source| RelayError::Transport {
                stage: Stage::Upload,
                source,
            })?;
        let form = multipart::Form::new()
            .text("purpose", "ocr")
            .part("file", part);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .timeout(Duration::from_secs(self.config.upload_timeout_secs))
            .send()
            .await
            .map_err(|source| RelayError::Transport {
                stage: Stage::Upload,
                source,
            })?;
        let response = check_status(Stage::Upload, response).await?;

        let body: FileUploadResponse =
            response.json().await.map_err(|source| RelayError::Transport {
                stage: Stage::Upload,
                source,
            })?;
        body.id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| RelayError::UnexpectedResponse {
                stage: Stage::Upload,
                detail: "upload response carried no file id".into(),
            })
    }

    /// Exchange a file id for a time-limited signed document URL.
    pub async fn signed_url(&self, file_id: &str) -> Result<String, RelayError> {
        let url = self.resolver.resolve(&format!("/v1/files/{file_id}/url"));
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .query(&[("expiry", self.config.signed_url_expiry_hours)])
            .send()
            .await
            .map_err(|source| RelayError::Transport {
                stage: Stage::Sign,
                source,
            })?;
        let response = check_status(Stage::Sign, response).await?;

        let body: SignedUrlResponse =
            response.json().await.map_err(|source| RelayError::Transport {
                stage: Stage::Sign,
                source,
            })?;
        body.url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| RelayError::UnexpectedResponse {
                stage: Stage::Sign,
                detail: "signed-url response carried no url".into(),
            })
    }

    /// Run OCR against a signed document URL.
    ///
    /// `pages` are the engine's 0-based indices
    /// (see [`crate::selection::PageSelection::to_zero_based`]).
    pub async fn ocr(
        &self,
        document_url: &str,
        pages: Option<&[u32]>,
        include_image_base64: bool,
    ) -> Result<OcrResult, RelayError> {
        self.with_retry(Stage::Ocr, || {
            self.ocr_once(document_url, pages, include_image_base64)
        })
        .await
    }

    async fn ocr_once(
        &self,
        document_url: &str,
        pages: Option<&[u32]>,
        include_image_base64: bool,
    ) -> Result<OcrResult, RelayError> {
        let url = self.resolver.resolve("/v1/ocr");
        let body = OcrCallRequest {
            model: &self.config.ocr_model,
            document: DocumentRef::DocumentUrl { document_url },
            pages,
            include_image_base64,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|source| RelayError::Transport {
                stage: Stage::Ocr,
                source,
            })?;
        let response = check_status(Stage::Ocr, response).await?;

        let result: OcrResult =
            response.json().await.map_err(|source| RelayError::Transport {
                stage: Stage::Ocr,
                source,
            })?;
        debug!(pages = result.pages.len(), model = ?result.model, "ocr complete");
        Ok(result)
    }

    /// Answer a question grounded in the signed document.
    pub async fn answer(&self, document_url: &str, query: &str) -> Result<String, RelayError> {
        self.with_retry(Stage::Answer, || self.answer_once(document_url, query))
            .await
    }

    async fn answer_once(&self, document_url: &str, query: &str) -> Result<String, RelayError> {
        let url = self.resolver.resolve("/v1/chat/completions");
        let body = ChatCallRequest {
            model: &self.config.qa_model,
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::DocumentUrl { document_url },
                    ContentPart::Text { text: query },
                ],
            }],
            max_tokens: self.config.max_answer_tokens,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|source| RelayError::Transport {
                stage: Stage::Answer,
                source,
            })?;
        let response = check_status(Stage::Answer, response).await?;

        let chat: ChatResponse =
            response.json().await.map_err(|source| RelayError::Transport {
                stage: Stage::Answer,
                source,
            })?;
        chat.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| RelayError::UnexpectedResponse {
                stage: Stage::Answer,
                detail: "chat response carried no answer content".into(),
            })
    }

    /// Run `call`, retrying transient failures with exponential backoff.
    async fn with_retry<T, F, Fut>(&self, stage: Stage, mut call: F) -> Result<T, RelayError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RelayError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match call().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(%stage, attempt, "engine call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if attempt < self.config.max_retries && err.is_transient() => {
                    let backoff = self.config.retry_backoff_ms * 2u64.pow(attempt);
                    warn!(
                        %stage,
                        attempt = attempt + 1,
                        max = self.config.max_retries,
                        backoff_ms = backoff,
                        error = %err,
                        "transient engine failure, retrying"
                    );
                    sleep(Duration::from_millis(backoff)).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Map a non-2xx response to the matching [`RelayError`] variant.
async fn check_status(stage: Stage, response: Response) -> Result<Response, RelayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        let detail = body_excerpt(response).await;
        return Err(RelayError::AuthRejected { stage, detail });
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse().ok());
        return Err(RelayError::RateLimited {
            stage,
            retry_after_secs,
        });
    }

    let detail = body_excerpt(response).await;
    Err(RelayError::ApiStatus {
        stage,
        status: status.as_u16(),
        detail,
    })
}

/// First ~400 characters of the response body, for error messages.
async fn body_excerpt(response: Response) -> String {
    const MAX_CHARS: usize = 400;
    match response.text().await {
        Ok(text) => {
            let text = text.trim();
            if text.is_empty() {
                return "<empty body>".to_string();
            }
            let mut excerpt: String = text.chars().take(MAX_CHARS).collect();
            if text.chars().count() > MAX_CHARS {
                excerpt.push('…');
            }
            excerpt
        }
        Err(_) => "<unreadable body>".to_string(),
    }
}
