//! The pair of prompts the answering pipeline renders on every request.

use crate::builder::build_prompt;
use crate::loader::{list_prompts, load_prompt};
use crate::types::{BuiltPrompt, PromptDefinition, PromptRole};
use std::collections::HashMap;
use std::path::Path;
use studyqa_core::{AppError, AppResult};

/// ID of the system prompt that carries the assembled study context.
pub const ANSWER_PROMPT_ID: &str = "studyqa.answer";

/// ID of the prompt that turns a follow-up into a standalone question.
pub const REPHRASE_PROMPT_ID: &str = "studyqa.rephrase";

/// Answer and rephrase prompts, loaded once at startup.
#[derive(Debug, Clone)]
pub struct PromptSet {
    answer: PromptDefinition,
    rephrase: PromptDefinition,
}

impl PromptSet {
    /// Load both prompts, honouring overrides in `prompts_dir`.
    pub fn load(prompts_dir: Option<&Path>) -> AppResult<Self> {
        let answer = load_prompt(prompts_dir, ANSWER_PROMPT_ID)?;
        let rephrase = load_prompt(prompts_dir, REPHRASE_PROMPT_ID)?;

        if prompts_dir.is_some() {
            for id in list_prompts(prompts_dir)? {
                if id != ANSWER_PROMPT_ID && id != REPHRASE_PROMPT_ID {
                    tracing::warn!(prompt_id = %id, "Prompt file matches no pipeline prompt; ignored");
                }
            }
        }

        if answer.role != PromptRole::System {
            return Err(AppError::Prompt(format!(
                "{} must use role 'system'",
                ANSWER_PROMPT_ID
            )));
        }

        Ok(Self { answer, rephrase })
    }

    /// The prompts shipped with the binary.
    pub fn builtin() -> AppResult<Self> {
        Self::load(None)
    }

    /// Render the answer instructions with `context` interpolated.
    pub fn render_answer(&self, context: &str) -> AppResult<BuiltPrompt> {
        let mut vars = HashMap::new();
        vars.insert("context".to_string(), context.to_string());
        build_prompt(&self.answer, vars)
    }

    /// Render the rephrase request for a transcript and follow-up question.
    pub fn render_rephrase(&self, chat_history: &str, input: &str) -> AppResult<BuiltPrompt> {
        let mut vars = HashMap::new();
        vars.insert("chat_history".to_string(), chat_history.to_string());
        vars.insert("input".to_string(), input.to_string());
        build_prompt(&self.rephrase, vars)
    }
}
