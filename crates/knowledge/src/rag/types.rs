//! Request and output types for the answering pipeline.

use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use studyqa_core::AppResult;

/// A question plus the conversation so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRequest {
    /// The current question
    pub input: String,

    /// Earlier `(human, ai)` turns, oldest first; may contain HTML
    #[serde(default)]
    pub chat_history: Vec<(String, String)>,
}

impl AnswerRequest {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            chat_history: Vec::new(),
        }
    }

    pub fn with_history(mut self, chat_history: Vec<(String, String)>) -> Self {
        self.chat_history = chat_history;
        self
    }
}

/// Answer text delivered incrementally. Finite and not restartable.
pub type AnswerStream = Pin<Box<dyn Stream<Item = AppResult<String>> + Send>>;

/// Model parameters shared by the rephrase and answer calls.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl GenerationSettings {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Build an LLM request carrying these settings.
    pub fn request(&self, messages: Vec<studyqa_llm::ChatMessage>) -> studyqa_llm::LlmRequest {
        let mut request = studyqa_llm::LlmRequest::new(messages, &self.model);
        if let Some(t) = self.temperature {
            request = request.with_temperature(t);
        }
        if let Some(n) = self.max_tokens {
            request = request.with_max_tokens(n);
        }
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let req: AnswerRequest = serde_json::from_str(
            r#"{"input":"and its size?","chat_history":[["What is CCAF?","An AF study."]]}"#,
        )
        .unwrap();

        assert_eq!(req.input, "and its size?");
        assert_eq!(
            req.chat_history,
            vec![("What is CCAF?".to_string(), "An AF study.".to_string())]
        );
    }

    #[test]
    fn test_history_defaults_to_empty() {
        let req: AnswerRequest = serde_json::from_str(r#"{"input":"hi"}"#).unwrap();
        assert!(req.chat_history.is_empty());
    }

    #[test]
    fn test_settings_applied_to_request() {
        let mut settings = GenerationSettings::new("mistral");
        settings.temperature = Some(0.1);

        let request = settings.request(vec![studyqa_llm::ChatMessage::human("q")]);
        assert_eq!(request.model, "mistral");
        assert_eq!(request.temperature, Some(0.1));
        assert_eq!(request.max_tokens, None);
    }
}
