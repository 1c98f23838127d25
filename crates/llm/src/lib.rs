//! LLM integration crate for StudyQA.
//!
//! Provides a provider-agnostic chat interface to the model server that
//! rewrites questions and writes answers.
//!
//! # Providers
//! - **OpenAI-compatible**: vLLM and other `/v1/chat/completions` servers
//! - **Ollama**: Local LLM runtime
//!
//! # Example
//! ```no_run
//! use studyqa_llm::{ChatMessage, LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new(vec![ChatMessage::human("Hello, world!")], "llama3");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
pub use factory::create_client;
pub use providers::{OllamaClient, OpenAiCompatibleClient};
pub use types::{ChatMessage, ChatRole, ProviderType};
