//! Question rewriting for follow-up questions.

use crate::history::{to_transcript, HistoryNormalizer};
use crate::rag::types::GenerationSettings;
use std::sync::Arc;
use studyqa_core::{AppError, AppResult};
use studyqa_llm::{ChatMessage, LlmClient};
use studyqa_prompt::PromptSet;

/// How the search query is obtained for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryBranch {
    /// Earlier turns exist: ask the model for a standalone question
    HasHistory,
    /// First question: search with the input as is
    NoHistory,
}

impl QueryBranch {
    /// Decided on whether any turns exist, not on their content.
    pub fn select(chat_history: &[(String, String)]) -> Self {
        if chat_history.is_empty() {
            Self::NoHistory
        } else {
            Self::HasHistory
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HasHistory => "has_history",
            Self::NoHistory => "no_history",
        }
    }
}

/// Produces the query used for retrieval.
#[derive(Clone)]
pub struct QueryRewriter {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptSet>,
    normalizer: HistoryNormalizer,
    settings: GenerationSettings,
}

impl QueryRewriter {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        prompts: Arc<PromptSet>,
        normalizer: HistoryNormalizer,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            llm,
            prompts,
            normalizer,
            settings,
        }
    }

    /// Resolve the retrieval query for `input`.
    ///
    /// With history the model output is returned verbatim, even when it
    /// equals the input. Model failures propagate, and a blank output is
    /// treated as malformed.
    pub async fn resolve(&self, input: &str, chat_history: &[(String, String)]) -> AppResult<String> {
        match QueryBranch::select(chat_history) {
            QueryBranch::NoHistory => Ok(input.to_string()),
            QueryBranch::HasHistory => {
                let transcript = to_transcript(&self.normalizer.normalize(chat_history));
                let prompt = self.prompts.render_rephrase(&transcript, input)?;

                let request = self.settings.request(vec![ChatMessage::human(prompt.text)]);
                let response = self.llm.complete(&request).await?;

                if response.content.trim().is_empty() {
                    return Err(AppError::MalformedUpstream(
                        "Model returned a blank standalone question".to_string(),
                    ));
                }

                tracing::debug!(standalone = %response.content, "Rephrased follow-up question");
                Ok(response.content)
            }
        }
    }
}
