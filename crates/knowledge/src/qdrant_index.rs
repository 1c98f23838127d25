//! Qdrant-backed vector index.
//!
//! Embeds the query text, runs `search_points` with payload, and turns each
//! scored point into a [`RetrievedHit`].

use crate::embeddings::EmbeddingProvider;
use crate::types::RetrievedHit;
use crate::vector_index::VectorIndex;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::{PointId, SearchPointsBuilder, Value as QValue};
use qdrant_client::Qdrant;
use std::collections::HashMap;
use std::sync::Arc;
use studyqa_core::config::QdrantConfig;
use studyqa_core::{AppError, AppResult};

/// Vector index over a Qdrant collection of study questions.
pub struct QdrantIndex {
    client: Qdrant,
    collection: String,
    payload_id_key: String,
    metadata_key: String,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl QdrantIndex {
    /// Connect to Qdrant using `config`; `embedder` turns queries into vectors.
    ///
    /// The client connects lazily, so this does not fail when the server is down.
    pub fn new(config: &QdrantConfig, embedder: Arc<dyn EmbeddingProvider>) -> AppResult<Self> {
        let client = Qdrant::from_url(&config.url)
            .build()
            .map_err(|e| AppError::VectorIndex(format!("Failed to create Qdrant client: {}", e)))?;

        tracing::info!(
            url = %config.url,
            collection = %config.collection,
            embedder = embedder.provider_name(),
            model = embedder.model_name(),
            "Qdrant index configured"
        );

        Ok(Self {
            client,
            collection: config.collection.clone(),
            payload_id_key: config.payload_id_key.clone(),
            metadata_key: config.metadata_key.clone(),
            embedder,
        })
    }

    /// Check that the collection exists.
    pub async fn verify_collection(&self) -> AppResult<()> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| AppError::VectorIndex(format!("Qdrant unavailable: {}", e)))?;

        if !exists {
            return Err(AppError::VectorIndex(format!(
                "Qdrant collection '{}' does not exist",
                self.collection
            )));
        }
        Ok(())
    }

    fn to_hit(
        &self,
        point_id: Option<PointId>,
        score: f32,
        payload: HashMap<String, QValue>,
    ) -> RetrievedHit {
        let mut fields: serde_json::Map<String, serde_json::Value> = payload
            .into_iter()
            .map(|(k, v)| (k, v.into_json()))
            .collect();

        let external_id = fields
            .get(&self.payload_id_key)
            .and_then(|v| v.as_str())
            .map(str::to_string);

        let raw_metadata = fields
            .remove(&self.metadata_key)
            .filter(|v| !v.is_null())
            .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()));

        RetrievedHit {
            point_id: point_id_to_string(point_id),
            external_id,
            relevance_score: score,
            raw_metadata,
        }
    }
}

/// Qdrant points carry either a UUID or a numeric id.
fn point_id_to_string(id: Option<PointId>) -> String {
    match id.and_then(|pid| pid.point_id_options) {
        Some(PointIdOptions::Uuid(u)) => u,
        Some(PointIdOptions::Num(n)) => n.to_string(),
        None => String::new(),
    }
}

#[async_trait::async_trait]
impl VectorIndex for QdrantIndex {
    fn collection_name(&self) -> &str {
        &self.collection
    }

    #[tracing::instrument(skip(self, query), fields(collection = %self.collection))]
    async fn search(&self, query: &str, top_k: usize) -> AppResult<Vec<RetrievedHit>> {
        let vector = self.embedder.embed(query).await?;

        let builder =
            SearchPointsBuilder::new(&self.collection, vector, top_k as u64).with_payload(true);

        let response = self
            .client
            .search_points(builder)
            .await
            .map_err(|e| AppError::VectorIndex(format!("search_points: {}", e)))?;

        let hits: Vec<RetrievedHit> = response
            .result
            .into_iter()
            .map(|point| self.to_hit(point.id, point.score, point.payload))
            .collect();

        tracing::debug!(hits = hits.len(), "Qdrant search completed");
        Ok(hits)
    }
}
