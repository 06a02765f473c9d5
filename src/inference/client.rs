//! OpenAI-compatible inference client.
//!
//! Sends streaming requests to the configured endpoint and hands back a
//! `StreamUpdate` stream. Both the Chat Completions and the Responses wire
//! protocols are supported; which one is used is a per-request setting.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client as HttpClient;
use tokio_util::sync::CancellationToken;

use super::backend::{ApiFlavor, ModelBackend, StreamRequest, UpdateStream};
use super::errors::InferenceError;
use super::responses::{input_items, parse_responses_stream, ResponsesRequest, ResponsesTool};
use super::streaming::parse_chat_stream;
use super::types::{ChatCompletionRequest, ChatMessage};

// ─── Constants ───────────────────────────────────────────────────────────────

/// TCP connection timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest silent gap allowed while waiting on or reading a stream.
///
/// Screenshot-heavy contexts can take a while before the first token. There
/// is no cap on total duration; long answers end only on finish or Stop.
const STREAM_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

// ─── InferenceClient ─────────────────────────────────────────────────────────

/// HTTP model backend. Cheap to clone; the connection pool is shared.
#[derive(Debug, Clone)]
pub struct InferenceClient {
    http_stream: HttpClient,
}

impl InferenceClient {
    pub fn new() -> Result<Self, InferenceError> {
        Self::with_idle_timeout(STREAM_IDLE_TIMEOUT)
    }

    /// Like `new`, with a custom limit on the silent gap between reads.
    pub fn with_idle_timeout(idle: Duration) -> Result<Self, InferenceError> {
        let http_stream = HttpClient::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(idle)
            .build()
            .map_err(|e| InferenceError::ConfigError {
                reason: format!("failed to build streaming HTTP client: {e}"),
            })?;

        Ok(Self { http_stream })
    }

    async fn send(
        &self,
        url: &str,
        api_key: &str,
        body: serde_json::Value,
    ) -> Result<reqwest::Response, InferenceError> {
        let response = self
            .http_stream
            .post(url)
            .bearer_auth(api_key)
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(|e| InferenceError::ConnectionFailed {
                endpoint: url.to_string(),
                reason: if e.is_timeout() {
                    format!("timed out: {e}")
                } else {
                    e.to_string()
                },
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(InferenceError::HttpError {
                status: status.as_u16(),
                body: body_text,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl ModelBackend for InferenceClient {
    async fn open_stream(
        &self,
        request: StreamRequest,
        cancel: CancellationToken,
    ) -> Result<UpdateStream, InferenceError> {
        let url = request_url(&request);
        let body = request_body(&request)?;

        // Log the request metadata (not the full body, it carries screenshots)
        tracing::info!(
            url = %url,
            model = %request.model,
            api = ?request.api,
            message_count = request.messages.len(),
            tool_count = request.tools.len(),
            "=== LLM REQUEST ==="
        );

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(InferenceError::StreamError {
                    reason: "request cancelled before response".into(),
                });
            }
            response = self.send(&url, &request.api_key, body) => response?,
        };

        let bytes = response.bytes_stream();
        let updates = match request.api {
            ApiFlavor::ChatCompletions => parse_chat_stream(bytes).boxed(),
            ApiFlavor::Responses => parse_responses_stream(bytes).boxed(),
        };

        let token = cancel.clone();
        Ok(updates
            .take_until(async move { token.cancelled().await })
            .boxed())
    }
}

// ─── Request building ────────────────────────────────────────────────────────

fn request_url(request: &StreamRequest) -> String {
    let base = request.endpoint.trim_end_matches('/');
    match request.api {
        ApiFlavor::ChatCompletions => format!("{base}/chat/completions"),
        ApiFlavor::Responses => format!("{base}/responses"),
    }
}

/// Serialize the request body for the selected wire protocol.
pub fn request_body(request: &StreamRequest) -> Result<serde_json::Value, InferenceError> {
    let body = match request.api {
        ApiFlavor::ChatCompletions => {
            let tools = if request.tools.is_empty() {
                None
            } else {
                Some(request.tools.clone())
            };
            serde_json::to_value(ChatCompletionRequest {
                model: request.model.clone(),
                messages: request.messages.iter().map(ChatMessage::from_message).collect(),
                tool_choice: tools.as_ref().map(|_| "auto".to_string()),
                tools,
                stream: true,
            })
        }
        ApiFlavor::Responses => serde_json::to_value(ResponsesRequest {
            model: request.model.clone(),
            input: input_items(&request.messages),
            tools: request.tools.iter().map(ResponsesTool::from).collect(),
            stream: true,
        }),
    };

    body.map_err(|e| InferenceError::StreamError {
        reason: format!("failed to serialize request: {e}"),
    })
}

// ─── Tests ───────────────────────────────────────────────────────────────────
