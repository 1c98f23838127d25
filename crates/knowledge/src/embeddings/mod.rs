//! Query embedding for similarity search.

pub mod provider;
pub mod providers;

pub use provider::EmbeddingProvider;
pub use providers::{MockProvider, OllamaProvider};
