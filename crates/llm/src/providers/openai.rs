//! OpenAI-compatible chat completions provider.
//!
//! Works against any server exposing `POST {base}/v1/chat/completions`
//! (vLLM, OpenAI, llama.cpp server). Streaming uses server-sent events:
//! one `data: {json}` line per delta, terminated by `data: [DONE]`.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
use crate::providers::{error_for_status, line_stream};
use crate::types::ChatMessage;
use futures::StreamExt;
use reqwest::header;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use studyqa_core::{AppError, AppResult};

/// Key sent when the server does not check credentials (vLLM default).
pub const PLACEHOLDER_API_KEY: &str = "EMPTY";

const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Delta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

impl From<Usage> for LlmUsage {
    fn from(u: Usage) -> Self {
        LlmUsage::new(u.prompt_tokens, u.completion_tokens)
    }
}

/// One parsed server-sent event line.
#[derive(Debug)]
enum SseEvent {
    Chunk(LlmStreamChunk),
    Done,
    Skip,
}

/// Parse a single SSE line from a chat completions stream.
fn parse_sse_line(line: &str) -> AppResult<SseEvent> {
    let Some(data) = line.strip_prefix("data:") else {
        // comments (": keep-alive") and event/id fields carry no content
        return Ok(SseEvent::Skip);
    };
    let data = data.trim();
    if data == "[DONE]" {
        return Ok(SseEvent::Done);
    }

    let chunk: ChatCompletionChunk = serde_json::from_str(data)
        .map_err(|e| AppError::Llm(format!("Failed to parse chunk: {}", e)))?;

    let (content, finished) = match chunk.choices.into_iter().next() {
        Some(choice) => (
            choice.delta.content.unwrap_or_default(),
            choice.finish_reason.is_some(),
        ),
        None => (String::new(), false),
    };

    Ok(SseEvent::Chunk(LlmStreamChunk {
        content,
        model: chunk.model,
        done: finished,
        usage: chunk.usage.map(Into::into),
    }))
}

/// Client for OpenAI-compatible chat completion servers.
#[derive(Debug)]
pub struct OpenAiCompatibleClient {
    client: reqwest::Client,
    url_chat: String,
}

impl OpenAiCompatibleClient {
    /// Build a client for `base_url`.
    ///
    /// A missing `api_key` falls back to [`PLACEHOLDER_API_KEY`].
    pub fn new(
        base_url: &str,
        api_key: Option<&str>,
        timeout_secs: Option<u64>,
    ) -> AppResult<Self> {
        let base = base_url.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(AppError::Config(format!(
                "Invalid OpenAI-compatible endpoint: '{}'",
                base_url
            )));
        }

        let key = api_key.unwrap_or(PLACEHOLDER_API_KEY);
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|e| AppError::Config(format!("Invalid API key header: {}", e)))?,
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let timeout = Duration::from_secs(timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| AppError::Llm(format!("Failed to create HTTP client: {}", e)))?;

        let url_chat = chat_url(base);
        tracing::info!(endpoint = %url_chat, timeout_secs = timeout.as_secs(), "OpenAI-compatible client initialized");

        Ok(Self { client, url_chat })
    }

    fn to_request<'a>(&self, request: &'a LlmRequest, stream: bool) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &request.model,
            messages: &request.messages,
            stream,
            temperature: request.temperature,
            top_p: request.top_p,
            max_tokens: request.max_tokens,
        }
    }

    async fn send(&self, request: &LlmRequest, stream: bool) -> AppResult<reqwest::Response> {
        let body = self.to_request(request, stream);
        let response = self
            .client
            .post(&self.url_chat)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to reach {}: {}", self.url_chat, e)))?;

        error_for_status("OpenAI-compatible", response).await
    }
}

/// Accepts a bare host or one already ending in `/v1`.
fn chat_url(base: &str) -> String {
    let base = base.trim_end_matches('/');
    if base.ends_with("/v1") {
        format!("{}/chat/completions", base)
    } else {
        format!("{}/v1/chat/completions", base)
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiCompatibleClient {
    fn provider_name(&self) -> &str {
        "openai-compatible"
    }

    #[tracing::instrument(skip(self, request), fields(model = %request.model, messages = request.messages.len()))]
    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        let response = self.send(request, false).await?;

        let out: ChatCompletionResponse = response.json().await.map_err(|e| {
            AppError::Llm(format!(
                "Failed to decode chat completion (expected choices[0].message.content): {}",
                e
            ))
        })?;

        let content = out
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AppError::Llm("Chat completion returned no choices".to_string()))?;

        Ok(LlmResponse {
            content,
            model: out.model,
            usage: out.usage.map(Into::into).unwrap_or_default(),
            done: true,
        })
    }

    #[tracing::instrument(skip(self, request), fields(model = %request.model, messages = request.messages.len()))]
    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        let response = self.send(request, true).await?;
        let model = request.model.clone();

        let events = line_stream(Box::pin(response.bytes_stream()))
            .map(|line| line.and_then(|l| parse_sse_line(&l)))
            .filter_map(|event| async move {
                match event {
                    Ok(SseEvent::Skip) => None,
                    other => Some(other),
                }
            });

        // Stop after [DONE] so trailing bytes are never read.
        let chunks = events
            .scan(false, move |finished, event| {
                let item = if *finished {
                    None
                } else {
                    match event {
                        Ok(SseEvent::Done) => {
                            *finished = true;
                            Some(Ok(LlmStreamChunk {
                                content: String::new(),
                                model: model.clone(),
                                done: true,
                                usage: None,
                            }))
                        }
                        Ok(SseEvent::Chunk(chunk)) => Some(Ok(chunk)),
                        Ok(SseEvent::Skip) => None,
                        Err(e) => {
                            *finished = true;
                            Some(Err(e))
                        }
                    }
                };
                futures::future::ready(item)
            });

        Ok(Box::pin(chunks))
    }
}
