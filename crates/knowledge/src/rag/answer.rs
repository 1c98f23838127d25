//! Answer synthesis from the assembled study context.

use crate::rag::types::{AnswerStream, GenerationSettings};
use futures::StreamExt;
use std::sync::Arc;
use studyqa_core::AppResult;
use studyqa_llm::{ChatMessage, LlmClient};
use studyqa_prompt::PromptSet;

/// Asks the model for a cited answer.
#[derive(Clone)]
pub struct Synthesizer {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptSet>,
    settings: GenerationSettings,
}

impl Synthesizer {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptSet>, settings: GenerationSettings) -> Self {
        Self {
            llm,
            prompts,
            settings,
        }
    }

    /// `[system(instructions + context), ...history, human(input)]`
    pub fn build_messages(
        &self,
        input: &str,
        history: &[ChatMessage],
        context: &str,
    ) -> AppResult<Vec<ChatMessage>> {
        let instructions = self.prompts.render_answer(context)?;

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(instructions.text));
        messages.extend(history.iter().cloned());
        messages.push(ChatMessage::human(input));
        Ok(messages)
    }

    /// One model call; the completion text is the answer.
    pub async fn synthesize(
        &self,
        input: &str,
        history: &[ChatMessage],
        context: &str,
    ) -> AppResult<String> {
        let request = self.settings.request(self.build_messages(input, history, context)?);
        let response = self.llm.complete(&request).await?;

        tracing::debug!(
            prompt_tokens = response.usage.prompt_tokens,
            completion_tokens = response.usage.completion_tokens,
            "Answer synthesized"
        );
        Ok(response.content)
    }

    /// Like [`Synthesizer::synthesize`], yielding text fragments as they arrive.
    pub async fn synthesize_stream(
        &self,
        input: &str,
        history: &[ChatMessage],
        context: &str,
    ) -> AppResult<AnswerStream> {
        let request = self
            .settings
            .request(self.build_messages(input, history, context)?)
            .with_streaming();
        let chunks = self.llm.stream(&request).await?;

        let fragments = chunks.filter_map(|chunk| async move {
            match chunk {
                Ok(c) if c.content.is_empty() => None,
                Ok(c) => Some(Ok(c.content)),
                Err(e) => Some(Err(e)),
            }
        });

        Ok(Box::pin(fragments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fakes::RecordingLlm;
    use studyqa_llm::ChatRole;

    fn synthesizer(llm: Arc<RecordingLlm>) -> Synthesizer {
        Synthesizer::new(
            llm,
            Arc::new(PromptSet::builtin().unwrap()),
            GenerationSettings::new("test-model"),
        )
    }

    #[test]
    fn test_message_layout() {
        let s = synthesizer(Arc::new(RecordingLlm::replying("")));
        let history = vec![ChatMessage::human("hi"), ChatMessage::assistant("hello")];

        let messages = s.build_messages("What is CCAF?", &history, "CCAF (phs001189): \n AF").unwrap();

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, ChatRole::System);
        assert!(messages[0].content.contains("<study information>\nCCAF (phs001189): \n AF\n</study information>"));
        assert_eq!(messages[1], ChatMessage::human("hi"));
        assert_eq!(messages[2], ChatMessage::assistant("hello"));
        assert_eq!(messages[3], ChatMessage::human("What is CCAF?"));
    }

    #[tokio::test]
    async fn test_synthesize_returns_completion() {
        let llm = Arc::new(RecordingLlm::replying("CCAF (phs001189) studies AF."));
        let answer = synthesizer(llm.clone()).synthesize("q", &[], "").await.unwrap();

        assert_eq!(answer, "CCAF (phs001189) studies AF.");
        assert_eq!(llm.call_count(), 1);
        assert!(!llm.calls()[0].stream);
    }

    #[tokio::test]
    async fn test_stream_yields_fragments_in_order() {
        let llm = Arc::new(RecordingLlm::replying("one two three"));
        let stream = synthesizer(llm.clone())
            .synthesize_stream("q", &[], "")
            .await
            .unwrap();

        let parts: Vec<String> = stream.map(|p| p.unwrap()).collect().await;
        assert_eq!(parts.concat(), "one two three");
        assert!(parts.len() > 1);
        assert!(llm.calls()[0].stream);
    }
}
