//! Study retrieval and conversational answering.
//!
//! Retrieval is a Qdrant similarity search over embedded study questions,
//! hydrated from the authoritative study corpus. The [`rag`] module wires
//! retrieval, question rewriting and answer synthesis into one pipeline.

pub mod context;
pub mod corpus;
pub mod embeddings;
pub mod history;
pub mod qdrant_index;
pub mod rag;
pub mod retrieval;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

pub use context::ContextAssembler;
pub use corpus::{JsonStudyCorpus, StudyCorpus};
pub use embeddings::{EmbeddingProvider, MockProvider, OllamaProvider};
pub use history::HistoryNormalizer;
pub use qdrant_index::QdrantIndex;
pub use rag::{AnswerRequest, AnswerStream, PipelineOptions, RagPipeline};
pub use retrieval::Retriever;
pub use types::{DocumentMetadata, HydratedDocument, RetrievedHit, StudyRecord};
pub use vector_index::VectorIndex;
