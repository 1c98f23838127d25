//! RAG answering orchestration.
//!
//! For each request three branches run concurrently:
//! 1. the question is passed through
//! 2. the chat history is normalized
//! 3. the search query is resolved, studies are retrieved and the context
//!    is assembled
//!
//! Their results are merged into one synthesis call. The first failing
//! branch aborts the request and drops the others mid-flight.

use crate::context::ContextAssembler;
use crate::corpus::StudyCorpus;
use crate::history::HistoryNormalizer;
use crate::rag::answer::Synthesizer;
use crate::rag::rewrite::{QueryBranch, QueryRewriter};
use crate::rag::types::{AnswerRequest, AnswerStream, GenerationSettings};
use crate::retrieval::Retriever;
use crate::vector_index::VectorIndex;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use studyqa_core::config::{AppConfig, DEFAULT_TOP_K};
use studyqa_core::{AppError, AppResult};
use studyqa_llm::{ChatMessage, LlmClient};
use studyqa_prompt::PromptSet;
use tracing::Instrument;

/// Tunables for a pipeline instance.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub generation: GenerationSettings,
    pub top_k: usize,
    pub context_max_chars: Option<usize>,

    /// Deadline for producing an answer (or the first byte of a stream)
    pub request_timeout: Option<Duration>,
}

impl PipelineOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            generation: GenerationSettings::new(model),
            top_k: DEFAULT_TOP_K,
            context_max_chars: None,
            request_timeout: None,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            generation: GenerationSettings {
                model: config.llm.model.clone(),
                temperature: config.llm.temperature,
                max_tokens: config.llm.max_tokens,
            },
            top_k: config.retrieval.top_k,
            context_max_chars: config.retrieval.context_max_chars,
            request_timeout: Some(Duration::from_secs(config.server.request_timeout_secs)),
        }
    }
}

/// Merged output of the three branches.
struct Prepared {
    input: String,
    history: Vec<ChatMessage>,
    context: String,
}

/// The request-to-answer pipeline. Holds no per-request state.
#[derive(Clone)]
pub struct RagPipeline {
    normalizer: HistoryNormalizer,
    rewriter: QueryRewriter,
    retriever: Retriever,
    assembler: ContextAssembler,
    synthesizer: Synthesizer,
    request_timeout: Option<Duration>,
}

impl RagPipeline {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        index: Arc<dyn VectorIndex>,
        corpus: Arc<dyn StudyCorpus>,
        prompts: Arc<PromptSet>,
        options: PipelineOptions,
    ) -> AppResult<Self> {
        if options.top_k == 0 {
            return Err(AppError::Config("top_k must be greater than zero".to_string()));
        }

        let normalizer = HistoryNormalizer::new()?;

        Ok(Self {
            rewriter: QueryRewriter::new(
                Arc::clone(&llm),
                Arc::clone(&prompts),
                normalizer.clone(),
                options.generation.clone(),
            ),
            retriever: Retriever::new(index, corpus, options.top_k),
            assembler: ContextAssembler::new(options.context_max_chars),
            synthesizer: Synthesizer::new(llm, prompts, options.generation),
            normalizer,
            request_timeout: options.request_timeout,
        })
    }

    /// Answer a request with the complete text.
    pub async fn answer(&self, request: &AnswerRequest) -> AppResult<String> {
        let span = request_span(request, false);
        let started = Instant::now();

        let work = async {
            let prepared = self.prepare(request).await?;
            self.synthesizer
                .synthesize(&prepared.input, &prepared.history, &prepared.context)
                .await
        };

        let result = self.with_deadline(work).instrument(span.clone()).await;
        log_outcome(&span, &result, started);
        result
    }

    /// Answer a request as a stream of text fragments.
    ///
    /// The deadline covers everything up to the start of the model stream.
    pub async fn answer_stream(&self, request: &AnswerRequest) -> AppResult<AnswerStream> {
        let span = request_span(request, true);
        let started = Instant::now();

        let work = async {
            let prepared = self.prepare(request).await?;
            self.synthesizer
                .synthesize_stream(&prepared.input, &prepared.history, &prepared.context)
                .await
        };

        let result = self.with_deadline(work).instrument(span.clone()).await;
        log_outcome(&span, &result, started);
        result
    }

    async fn prepare(&self, request: &AnswerRequest) -> AppResult<Prepared> {
        if request.input.trim().is_empty() {
            return Err(AppError::InvalidRequest("input must not be blank".to_string()));
        }

        let (input, history, context) = tokio::try_join!(
            async { Ok::<_, AppError>(request.input.clone()) },
            async { Ok::<_, AppError>(self.normalizer.normalize(&request.chat_history)) },
            self.resolve_context(request),
        )?;

        Ok(Prepared {
            input,
            history,
            context,
        })
    }

    async fn resolve_context(&self, request: &AnswerRequest) -> AppResult<String> {
        let query = self
            .rewriter
            .resolve(&request.input, &request.chat_history)
            .await?;
        let documents = self.retriever.retrieve(&query).await?;
        Ok(self.assembler.assemble(&documents))
    }

    async fn with_deadline<T>(&self, work: impl Future<Output = AppResult<T>>) -> AppResult<T> {
        match self.request_timeout {
            Some(limit) => tokio::time::timeout(limit, work).await.map_err(|_| {
                AppError::Timeout(format!("no answer within {}s", limit.as_secs_f32()))
            })?,
            None => work.await,
        }
    }
}

fn request_span(request: &AnswerRequest, streaming: bool) -> tracing::Span {
    tracing::info_span!(
        "answer",
        branch = QueryBranch::select(&request.chat_history).as_str(),
        history_turns = request.chat_history.len(),
        streaming,
    )
}

fn log_outcome<T>(span: &tracing::Span, result: &AppResult<T>, started: Instant) {
    let _entered = span.enter();
    let elapsed_ms = started.elapsed().as_millis() as u64;
    match result {
        Ok(_) => tracing::info!(elapsed_ms, "Answer ready"),
        Err(e) if e.is_upstream() => tracing::error!(elapsed_ms, error = %e, "Upstream failure"),
        Err(e) => tracing::warn!(elapsed_ms, error = %e, "Answer failed"),
    }
}
