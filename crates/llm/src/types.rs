//! LLM provider and message types.

use serde::{Deserialize, Serialize};

/// Provider type selected by the `LLM_SERVER_TYPE` mode flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    /// OpenAI-compatible chat completions server (vLLM, OpenAI, llama.cpp server)
    OpenAiCompatible,
    /// Local Ollama runtime
    Ollama,
}

impl ProviderType {
    /// Parse provider type from a mode string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "vllm" | "openai" | "openai-compatible" => Some(Self::OpenAiCompatible),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }

    /// Get the canonical provider name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAiCompatible => "openai-compatible",
            Self::Ollama => "ollama",
        }
    }
}

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instructions for the model
    System,
    /// The person asking questions
    #[serde(rename = "user")]
    Human,
    /// The model's earlier replies
    Assistant,
}

impl ChatRole {
    /// Label used when a conversation is rendered as a plain transcript.
    pub fn transcript_label(&self) -> &'static str {
        match self {
            Self::System => "System",
            Self::Human => "Human",
            Self::Assistant => "Assistant",
        }
    }
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Human,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}
