//! Vector index abstraction for study retrieval.

use crate::types::RetrievedHit;
use studyqa_core::AppResult;

/// Similarity search over the study question collection.
///
/// Implementations are shared across concurrent requests and must be
/// read-only from the pipeline's point of view.
#[async_trait::async_trait]
pub trait VectorIndex: Send + Sync {
    /// Name of the collection searched, recorded as document provenance.
    fn collection_name(&self) -> &str;

    /// Return at most `top_k` hits for `query`, ordered by descending score.
    ///
    /// Errors when the index (or the embedding model it depends on) is
    /// unavailable.
    async fn search(&self, query: &str, top_k: usize) -> AppResult<Vec<RetrievedHit>>;
}
