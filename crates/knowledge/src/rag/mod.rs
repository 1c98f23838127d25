//! Conversational RAG answering over study abstracts.
//!
//! History normalization, question rewriting and retrieval run concurrently;
//! their results meet in answer synthesis.

pub mod answer;
pub mod pipeline;
pub mod rewrite;
pub mod types;

pub use answer::Synthesizer;
pub use pipeline::{PipelineOptions, RagPipeline};
pub use rewrite::{QueryBranch, QueryRewriter};
pub use types::{AnswerRequest, AnswerStream, GenerationSettings};
