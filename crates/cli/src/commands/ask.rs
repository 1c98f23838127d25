//! Ask command handler.
//!
//! Runs one request through the answering pipeline and prints the result.

use crate::app::{build_pipeline, Preflight};
use clap::Args;
use futures::StreamExt;
use std::io::Write;
use std::path::{Path, PathBuf};
use studyqa_core::{config::AppConfig, AppError, AppResult};
use studyqa_knowledge::{AnswerRequest, RagPipeline};

/// Answer one question and print the result
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: Option<String>,

    /// Read the question from a file
    #[arg(short, long, conflicts_with = "question")]
    pub file: Option<PathBuf>,

    /// JSON file with earlier turns: `[["question", "answer"], ...]`
    #[arg(long)]
    pub history_file: Option<PathBuf>,

    /// Print the answer once complete instead of as it is generated
    #[arg(long)]
    pub no_stream: bool,

    /// Output as JSON (implies --no-stream)
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");

        let request = self.build_request()?;
        tracing::debug!(
            history_turns = request.chat_history.len(),
            "Question: {}",
            request.input
        );

        let pipeline = build_pipeline(config, Preflight::Skip).await?;

        if self.is_streaming() {
            self.handle_streaming(&pipeline, &request).await
        } else {
            self.handle_non_streaming(&pipeline, &request, config).await
        }
    }

    async fn handle_non_streaming(
        &self,
        pipeline: &RagPipeline,
        request: &AnswerRequest,
        config: &AppConfig,
    ) -> AppResult<()> {
        let answer = pipeline.answer(request).await?;

        if self.json {
            let output = serde_json::json!({
                "answer": answer,
                "model": config.llm.model,
                "serverType": config.llm.server_type,
                "historyTurns": request.chat_history.len(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", answer);
        }

        Ok(())
    }

    async fn handle_streaming(&self, pipeline: &RagPipeline, request: &AnswerRequest) -> AppResult<()> {
        let mut fragments = pipeline.answer_stream(request).await?;
        let mut stdout = std::io::stdout();

        while let Some(fragment) = fragments.next().await {
            print!("{}", fragment?);
            stdout.flush().ok();
        }
        println!();

        Ok(())
    }

    fn build_request(&self) -> AppResult<AnswerRequest> {
        let input = match (&self.question, &self.file) {
            (Some(q), _) => q.clone(),
            (None, Some(path)) => std::fs::read_to_string(path)?.trim_end().to_string(),
            (None, None) => return Err(AppError::Config("No question provided".to_string())),
        };

        let chat_history = match &self.history_file {
            Some(path) => read_history(path)?,
            None => Vec::new(),
        };

        Ok(AnswerRequest::new(input).with_history(chat_history))
    }

    pub fn is_streaming(&self) -> bool {
        !self.no_stream && !self.json
    }
}

/// Read `(human, ai)` turns from a JSON file.
fn read_history(path: &Path) -> AppResult<Vec<(String, String)>> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        AppError::Config(format!("Failed to read history file {:?}: {}", path, e))
    })?;
    serde_json::from_str(&contents).map_err(|e| {
        AppError::Config(format!("History file {:?} is not a list of turns: {}", path, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> AskCommand {
        AskCommand {
            question: None,
            file: None,
            history_file: None,
            no_stream: false,
            json: false,
        }
    }

    #[test]
    fn test_request_from_question_and_history() {
        let dir = tempfile::tempdir().unwrap();
        let history = dir.path().join("history.json");
        std::fs::write(&history, r#"[["What is CCAF?", "<p>An AF study.</p>"]]"#).unwrap();

        let cmd = AskCommand {
            question: Some("How many participants?".to_string()),
            history_file: Some(history),
            ..command()
        };
        let request = cmd.build_request().unwrap();

        assert_eq!(request.input, "How many participants?");
        assert_eq!(
            request.chat_history,
            vec![("What is CCAF?".to_string(), "<p>An AF study.</p>".to_string())]
        );
    }

    #[test]
    fn test_question_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("q.txt");
        std::fs::write(&path, "What does study phs001189 study?\n").unwrap();

        let cmd = AskCommand {
            file: Some(path),
            ..command()
        };
        assert_eq!(cmd.build_request().unwrap().input, "What does study phs001189 study?");
    }

    #[test]
    fn test_missing_question() {
        assert!(matches!(command().build_request(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_bad_history_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, r#"{"turns": 1}"#).unwrap();

        let cmd = AskCommand {
            question: Some("q".to_string()),
            history_file: Some(path),
            ..command()
        };
        assert!(matches!(cmd.build_request(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_json_disables_streaming() {
        assert!(command().is_streaming());
        let cmd = AskCommand {
            json: true,
            ..command()
        };
        assert!(!cmd.is_streaming());
    }
}
