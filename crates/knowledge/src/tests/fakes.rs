//! Hand-written collaborators for tests.

use crate::corpus::JsonStudyCorpus;
use crate::types::{RetrievedHit, StudyRecord};
use crate::vector_index::VectorIndex;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use studyqa_core::{AppError, AppResult};
use studyqa_llm::{
    ChatRole, LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage,
};

type Responder = Box<dyn Fn(&LlmRequest) -> String + Send + Sync>;

/// LLM that records every request and answers from a closure.
pub struct RecordingLlm {
    responder: Option<Responder>,
    calls: Mutex<Vec<LlmRequest>>,
}

impl RecordingLlm {
    pub fn replying(reply: &str) -> Self {
        let reply = reply.to_string();
        Self::scripted(move |_| reply.clone())
    }

    pub fn scripted(f: impl Fn(&LlmRequest) -> String + Send + Sync + 'static) -> Self {
        Self {
            responder: Some(Box::new(f)),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails as if the model server were down.
    pub fn failing() -> Self {
        Self {
            responder: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<LlmRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn respond(&self, request: &LlmRequest) -> AppResult<String> {
        self.calls.lock().unwrap().push(request.clone());
        match &self.responder {
            Some(f) => Ok(f(request)),
            None => Err(AppError::Llm("connection refused".to_string())),
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for RecordingLlm {
    fn provider_name(&self) -> &str {
        "recording"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        let content = self.respond(request)?;
        Ok(LlmResponse {
            content,
            model: request.model.clone(),
            usage: LlmUsage::new(1, 1),
            done: true,
        })
    }

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        let content = self.respond(request)?;
        let model = request.model.clone();

        // split after spaces so the pieces concatenate back to the reply
        let mut chunks: Vec<AppResult<LlmStreamChunk>> = content
            .split_inclusive(' ')
            .map(|piece| {
                Ok(LlmStreamChunk {
                    content: piece.to_string(),
                    model: model.clone(),
                    done: false,
                    usage: None,
                })
            })
            .collect();
        chunks.push(Ok(LlmStreamChunk {
            content: String::new(),
            model,
            done: true,
            usage: Some(LlmUsage::new(1, 1)),
        }));

        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}

/// Text of the system message, where the answer prompt carries the context.
pub fn system_text(request: &LlmRequest) -> &str {
    request
        .messages
        .iter()
        .find(|m| m.role == ChatRole::System)
        .map(|m| m.content.as_str())
        .unwrap_or("")
}

/// Index returning a fixed hit list and recording the queries it saw.
pub struct CannedIndex {
    hits: Vec<RetrievedHit>,
    queries: Mutex<Vec<String>>,
    delay: Option<Duration>,
    unavailable: bool,
}

impl CannedIndex {
    pub fn new(hits: Vec<RetrievedHit>) -> Self {
        Self {
            hits,
            queries: Mutex::new(Vec::new()),
            delay: None,
            unavailable: false,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn slow(hits: Vec<RetrievedHit>, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new(hits)
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl VectorIndex for CannedIndex {
    fn collection_name(&self) -> &str {
        "studies"
    }

    async fn search(&self, query: &str, top_k: usize) -> AppResult<Vec<RetrievedHit>> {
        self.queries.lock().unwrap().push(query.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.unavailable {
            return Err(AppError::VectorIndex("connection refused".to_string()));
        }
        Ok(self.hits.iter().take(top_k).cloned().collect())
    }
}

pub fn hit(external_id: &str, score: f32) -> RetrievedHit {
    RetrievedHit {
        point_id: format!("pt-{}", external_id),
        external_id: Some(external_id.to_string()),
        relevance_score: score,
        raw_metadata: serde_json::json!({}),
    }
}

pub fn study(id: &str, name: &str, description: &str) -> StudyRecord {
    StudyRecord {
        study_id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
    }
}

pub fn corpus(records: Vec<StudyRecord>) -> Arc<JsonStudyCorpus> {
    Arc::new(JsonStudyCorpus::from_records(records))
}
