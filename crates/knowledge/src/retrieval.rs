//! Retrieval: similarity search plus hydration from the study corpus.

use crate::corpus::StudyCorpus;
use crate::types::{DocumentMetadata, HydratedDocument, RetrievedHit};
use crate::vector_index::VectorIndex;
use std::sync::Arc;
use studyqa_core::{AppError, AppResult};

/// Searches the index and joins every hit to its study record.
#[derive(Clone)]
pub struct Retriever {
    index: Arc<dyn VectorIndex>,
    corpus: Arc<dyn StudyCorpus>,
    top_k: usize,
}

impl Retriever {
    pub fn new(index: Arc<dyn VectorIndex>, corpus: Arc<dyn StudyCorpus>, top_k: usize) -> Self {
        Self {
            index,
            corpus,
            top_k,
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Retrieve up to `top_k` hydrated documents for `query`, in index order.
    ///
    /// Hits whose study is missing from the corpus are kept with empty
    /// content. A hit without a usable identifier fails the whole call.
    pub async fn retrieve(&self, query: &str) -> AppResult<Vec<HydratedDocument>> {
        let hits = self.index.search(query, self.top_k).await?;
        if hits.len() > self.top_k {
            tracing::warn!(
                returned = hits.len(),
                top_k = self.top_k,
                "Vector index returned more hits than requested; truncating"
            );
        }

        let collection = self.index.collection_name();
        let lookups = hits
            .into_iter()
            .take(self.top_k)
            .map(|hit| self.hydrate(hit, collection));

        let documents = futures::future::try_join_all(lookups).await?;

        let missing = documents.iter().filter(|d| d.content.is_empty()).count();
        tracing::debug!(
            documents = documents.len(),
            missing_records = missing,
            "Hydrated retrieval hits"
        );

        Ok(documents)
    }

    async fn hydrate(&self, hit: RetrievedHit, collection: &str) -> AppResult<HydratedDocument> {
        let external_id = hit.external_id.as_deref().ok_or_else(|| {
            AppError::MalformedUpstream(format!(
                "Hit {} has no string study identifier in its payload",
                hit.point_id
            ))
        })?;
        let study_id = study_id_from_external(external_id)?.to_string();

        let content = match self.corpus.lookup(&study_id).await? {
            Some(record) => record.to_context_block(),
            None => {
                tracing::debug!(study_id = %study_id, "No corpus record for retrieved study");
                String::new()
            }
        };

        Ok(HydratedDocument {
            study_id: study_id.clone(),
            content,
            metadata: DocumentMetadata {
                relevance_score: hit.relevance_score,
                study_id,
                source_collection: collection.to_string(),
                point_id: hit.point_id,
                raw: hit.raw_metadata,
            },
        })
    }
}

/// Study id is everything before the first `.` of `"<study_id>.<suffix>"`.
pub fn study_id_from_external(external_id: &str) -> AppResult<&str> {
    let study_id = external_id.split('.').next().unwrap_or_default();
    if study_id.is_empty() {
        return Err(AppError::MalformedUpstream(format!(
            "Cannot recover study id from '{}'",
            external_id
        )));
    }
    Ok(study_id)
}
