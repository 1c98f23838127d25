//! Prompt system for StudyQA.
//!
//! This crate provides structured prompt management with:
//! - YAML-based prompt definitions, built in and overridable from a directory
//! - Handlebars template rendering
//! - The answer/rephrase prompt pair used by the answering pipeline

pub mod builder;
pub mod loader;
pub mod set;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{list_prompts, load_prompt};
pub use set::{PromptSet, ANSWER_PROMPT_ID, REPHRASE_PROMPT_ID};
pub use types::{
    BuiltPrompt, BuiltPromptMetadata, PromptBehavior, PromptDefinition, PromptOutputSpec,
    PromptRole,
};
