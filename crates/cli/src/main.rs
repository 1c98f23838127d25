//! StudyQA CLI
//!
//! Serves the conversational study question-answering API, or answers a
//! single question from the terminal.

mod app;
mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, ServeCommand};
use std::path::PathBuf;
use studyqa_core::{config::AppConfig, logging, AppResult};

/// StudyQA - answer questions about research studies from their abstracts
#[derive(Parser, Debug)]
#[command(name = "studyqa")]
#[command(about = "Conversational question answering over study abstracts", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, env = "STUDYQA_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Model server type (VLLM or OLLAMA)
    #[arg(short = 's', long, global = true, env = "LLM_SERVER_TYPE")]
    server_type: Option<String>,

    /// Generation model name
    #[arg(short, long, global = true, env = "GEN_MODEL_NAME")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API
    Serve(ServeCommand),

    /// Answer one question and print the result
    Ask(AskCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(cli.config.as_deref())?.with_overrides(
        cli.server_type,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("StudyQA starting");
    tracing::debug!(
        server_type = %config.llm.server_type,
        model = %config.llm.model,
        collection = %config.qdrant.collection,
        "Configuration loaded"
    );

    config.validate()?;

    let command_name = match &cli.command {
        Commands::Serve(_) => "serve",
        Commands::Ask(_) => "ask",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Serve(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
