//! Wiring from configuration to a ready pipeline.

use std::sync::Arc;
use studyqa_core::{config::AppConfig, AppResult};
use studyqa_knowledge::{
    JsonStudyCorpus, OllamaProvider, PipelineOptions, QdrantIndex, RagPipeline,
};
use studyqa_llm::{create_client, LlmClient};
use studyqa_prompt::PromptSet;

/// How much checking to do against the upstream services before serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preflight {
    Skip,
    Verify,
}

/// Build the answering pipeline described by `config`.
///
/// The corpus and prompts are read here, so a bad file fails startup
/// rather than the first request.
pub async fn build_pipeline(config: &AppConfig, preflight: Preflight) -> AppResult<RagPipeline> {
    let llm = create_client(
        &config.llm.server_type,
        &config.llm.url,
        config.llm.api_key.as_deref(),
        config.llm.timeout_secs,
    )?;

    let embedder = Arc::new(OllamaProvider::new(
        &config.embedding.url,
        &config.embedding.model,
        config.embedding.dimensions,
    )?);
    if preflight == Preflight::Verify {
        embedder.verify_connection().await?;
    }

    let index = QdrantIndex::new(&config.qdrant, embedder)?;
    if preflight == Preflight::Verify {
        index.verify_collection().await?;
    }

    let corpus = JsonStudyCorpus::load(&config.corpus.studies_file)?;
    let prompts = PromptSet::load(config.prompts_dir.as_deref())?;

    tracing::info!(
        provider = llm.provider_name(),
        model = %config.llm.model,
        top_k = config.retrieval.top_k,
        "Answering pipeline ready"
    );

    RagPipeline::new(
        llm,
        Arc::new(index),
        Arc::new(corpus),
        Arc::new(prompts),
        PipelineOptions::from_config(config),
    )
}
