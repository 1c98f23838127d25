//! LLM provider implementations and shared HTTP helpers.

pub mod ollama;
pub mod openai;

pub use ollama::OllamaClient;
pub use openai::OpenAiCompatibleClient;

use futures::{Stream, StreamExt};
use std::collections::VecDeque;
use studyqa_core::{AppError, AppResult};

/// Longest slice of an upstream error body kept in error messages.
const MAX_ERROR_SNIPPET: usize = 300;

/// Turn a non-2xx response into `AppError::Llm`, keeping a short body snippet.
pub(crate) async fn error_for_status(
    provider: &str,
    response: reqwest::Response,
) -> AppResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    let snippet: String = body.chars().take(MAX_ERROR_SNIPPET).collect();

    tracing::error!(%status, provider, "LLM server returned non-success status");

    Err(AppError::Llm(format!(
        "{} API error ({}): {}",
        provider, status, snippet
    )))
}

struct LineState<S> {
    inner: S,
    buffer: Vec<u8>,
    pending: VecDeque<String>,
    finished: bool,
}

/// Re-frame an HTTP byte stream into trimmed, non-empty text lines.
///
/// Lines may span several network chunks; a trailing line without a newline
/// is emitted when the body ends.
pub(crate) fn line_stream<S, B>(inner: S) -> impl Stream<Item = AppResult<String>> + Send
where
    S: Stream<Item = Result<B, reqwest::Error>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let state = LineState {
        inner,
        buffer: Vec::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    futures::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(line) = st.pending.pop_front() {
                return Some((Ok(line), st));
            }
            if st.finished {
                return None;
            }

            match st.inner.next().await {
                Some(Ok(chunk)) => {
                    st.buffer.extend_from_slice(chunk.as_ref());
                    while let Some(pos) = st.buffer.iter().position(|b| *b == b'\n') {
                        let raw: Vec<u8> = st.buffer.drain(..=pos).collect();
                        let line = String::from_utf8_lossy(&raw).trim().to_string();
                        if !line.is_empty() {
                            st.pending.push_back(line);
                        }
                    }
                }
                Some(Err(e)) => {
                    st.finished = true;
                    return Some((Err(AppError::Llm(format!("Stream error: {}", e))), st));
                }
                None => {
                    st.finished = true;
                    let rest = String::from_utf8_lossy(&st.buffer).trim().to_string();
                    st.buffer.clear();
                    if !rest.is_empty() {
                        st.pending.push_back(rest);
                    }
                }
            }
        }
    })
}
