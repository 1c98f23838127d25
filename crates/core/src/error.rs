//! Error types for StudyQA.
//!
//! This module defines a unified error enum that covers every failure the
//! answering pipeline can surface: configuration, I/O, the language model and
//! vector index upstreams, malformed upstream data, the study corpus, and
//! prompt rendering.

use thiserror::Error;

/// Unified error type for StudyQA.
///
/// All fallible functions return `Result<T, AppError>`.
/// A missing study record is not an error: hydration degrades to empty content.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Language model endpoint unreachable or returned a non-2xx status
    #[error("LLM error: {0}")]
    Llm(String),

    /// Vector index (or its embedding model) unreachable or failing
    #[error("Vector index error: {0}")]
    VectorIndex(String),

    /// Upstream returned data the pipeline cannot interpret
    #[error("Malformed upstream data: {0}")]
    MalformedUpstream(String),

    /// Study corpus could not be loaded
    #[error("Corpus error: {0}")]
    Corpus(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The request itself cannot be answered (e.g. a blank question)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A request exceeded its deadline
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether this error means an upstream service was unavailable.
    pub fn is_upstream(&self) -> bool {
        matches!(self, AppError::Llm(_) | AppError::VectorIndex(_))
    }

    /// Short machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config_error",
            AppError::Io(_) => "io_error",
            AppError::Llm(_) | AppError::VectorIndex(_) => "upstream_unavailable",
            AppError::MalformedUpstream(_) => "malformed_upstream_data",
            AppError::Corpus(_) => "corpus_error",
            AppError::Prompt(_) => "prompt_error",
            AppError::Serialization(_) => "serialization_error",
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::Timeout(_) => "timeout",
            AppError::Other(_) => "internal",
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
