//! Configuration management for StudyQA.
//!
//! Configuration is merged from several sources, later ones winning:
//! - Built-in defaults
//! - A YAML config file (`STUDYQA_CONFIG`, or `./studyqa.yaml` when present)
//! - Environment variables
//! - Command-line flags (applied by the binary through [`AppConfig::with_overrides`])

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{AppError, AppResult};

/// Language model backends understood by `LLM_SERVER_TYPE`.
pub const KNOWN_SERVER_TYPES: [&str; 2] = ["VLLM", "OLLAMA"];

/// Number of hits requested from the vector index per question.
pub const DEFAULT_TOP_K: usize = 20;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    /// Config file this configuration was merged from, if any
    #[serde(skip)]
    pub config_file: Option<PathBuf>,

    /// HTTP server settings
    pub server: ServerConfig,

    /// Language model settings
    pub llm: LlmConfig,

    /// Qdrant vector index settings
    pub qdrant: QdrantConfig,

    /// Query embedding settings
    pub embedding: EmbeddingConfig,

    /// Study corpus settings
    pub corpus: CorpusConfig,

    /// Retrieval and context assembly settings
    pub retrieval: RetrievalConfig,

    /// Directory holding prompt definition overrides
    pub prompts_dir: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    /// Bind address, e.g. "127.0.0.1:8000"
    pub address: String,

    /// Deadline for a whole answer request
    pub request_timeout_secs: u64,
}

/// Language model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LlmConfig {
    /// Backend type: "VLLM" (OpenAI-compatible) or "OLLAMA"
    pub server_type: String,

    /// Base URL of the model server
    pub url: String,

    /// Generation model name
    pub model: String,

    /// API key for OpenAI-compatible servers
    pub api_key: Option<String>,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,

    /// HTTP timeout for model calls
    pub timeout_secs: Option<u64>,
}

/// Qdrant settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QdrantConfig {
    /// gRPC URL of the Qdrant server
    pub url: String,

    /// Collection holding the study question embeddings
    pub collection: String,

    /// Payload field carrying the "<study_id>.<suffix>" identifier
    pub payload_id_key: String,

    /// Payload field carrying free-form metadata
    pub metadata_key: String,
}

/// Query embedding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbeddingConfig {
    /// Base URL of the Ollama server producing embeddings
    pub url: String,

    /// Embedding model name
    pub model: String,

    /// Expected vector size; checked when set
    pub dimensions: Option<usize>,
}

/// Study corpus settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CorpusConfig {
    /// JSON file with an array of `{StudyId, StudyName, Description}` records
    pub studies_file: PathBuf,
}

/// Retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrievalConfig {
    /// Hits requested from the vector index
    pub top_k: usize,

    /// Optional character budget for the assembled context
    pub context_max_chars: Option<usize>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_file: None,
            server: ServerConfig::default(),
            llm: LlmConfig::default(),
            qdrant: QdrantConfig::default(),
            embedding: EmbeddingConfig::default(),
            corpus: CorpusConfig::default(),
            retrieval: RetrievalConfig::default(),
            prompts_dir: None,
            log_level: None,
            verbose: false,
            no_color: false,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8000".to_string(),
            request_timeout_secs: 120,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            server_type: "OLLAMA".to_string(),
            url: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
            api_key: None,
            temperature: None,
            max_tokens: None,
            timeout_secs: Some(120),
        }
    }
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6334".to_string(),
            collection: "studies".to_string(),
            payload_id_key: "question_id".to_string(),
            metadata_key: "metadata".to_string(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: None,
        }
    }
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            studies_file: PathBuf::from("studies.json"),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            context_max_chars: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default config file location and environment.
    ///
    /// Environment variables:
    /// - `STUDYQA_CONFIG`: Path to a YAML config file
    /// - `LLM_SERVER_TYPE`, `LLM_URL`, `GEN_MODEL_NAME`, `LLM_API_KEY`, `LLM_TEMPERATURE`
    /// - `QDRANT_URL`, `QDRANT_COLLECTION_NAME`, `QDRANT_PAYLOAD_ID_KEY`
    /// - `EMBEDDING_URL`, `EMBEDDING_MODEL`, `EMBEDDING_DIM`
    /// - `STUDIES_JSON_FILE`
    /// - `RETRIEVAL_TOP_K`, `CONTEXT_MAX_CHARS`
    /// - `API_ADDRESS`, `REQUEST_TIMEOUT_SECS`
    /// - `PROMPTS_DIR`
    /// - `RUST_LOG`, `NO_COLOR`
    ///
    /// # Example
    /// ```no_run
    /// use studyqa_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Collection: {}", config.qdrant.collection);
    /// ```
    pub fn load() -> AppResult<Self> {
        let explicit = std::env::var("STUDYQA_CONFIG").ok().map(PathBuf::from);
        Self::load_from(explicit.as_deref())
    }

    /// Load configuration using an explicit config file (if given).
    ///
    /// An explicit file must exist; the implicit `./studyqa.yaml` is optional.
    pub fn load_from(config_file: Option<&Path>) -> AppResult<Self> {
        let mut config = match config_file {
            Some(path) => {
                if !path.exists() {
                    return Err(AppError::Config(format!(
                        "Config file does not exist: {:?}",
                        path
                    )));
                }
                Self::from_yaml_file(path)?
            }
            None => {
                let implicit = PathBuf::from("studyqa.yaml");
                if implicit.exists() {
                    Self::from_yaml_file(&implicit)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env_with(|key| std::env::var(key).ok())?;

        Ok(config)
    }

    /// Parse a YAML config file on top of the defaults.
    fn from_yaml_file(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let mut config: AppConfig = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;
        config.config_file = Some(path.to_path_buf());
        config.llm.server_type = config.llm.server_type.to_uppercase();

        tracing::debug!("Merged config file {:?}", path);

        Ok(config)
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("LLM_SERVER_TYPE") {
            self.llm.server_type = v.to_uppercase();
        }
        if let Some(v) = lookup("LLM_URL") {
            self.llm.url = v;
        }
        if let Some(v) = lookup("GEN_MODEL_NAME") {
            self.llm.model = v;
        }
        if let Some(v) = lookup("LLM_API_KEY") {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = parse_var(&lookup, "LLM_TEMPERATURE")? {
            self.llm.temperature = Some(v);
        }

        if let Some(v) = lookup("QDRANT_URL") {
            self.qdrant.url = v;
        }
        if let Some(v) = lookup("QDRANT_COLLECTION_NAME") {
            self.qdrant.collection = v;
        }
        if let Some(v) = lookup("QDRANT_PAYLOAD_ID_KEY") {
            self.qdrant.payload_id_key = v;
        }

        if let Some(v) = lookup("EMBEDDING_URL") {
            self.embedding.url = v;
        }
        if let Some(v) = lookup("EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
        if let Some(v) = parse_var(&lookup, "EMBEDDING_DIM")? {
            self.embedding.dimensions = Some(v);
        }

        if let Some(v) = lookup("STUDIES_JSON_FILE") {
            self.corpus.studies_file = PathBuf::from(v);
        }

        if let Some(v) = parse_var(&lookup, "RETRIEVAL_TOP_K")? {
            self.retrieval.top_k = v;
        }
        if let Some(v) = parse_var(&lookup, "CONTEXT_MAX_CHARS")? {
            self.retrieval.context_max_chars = Some(v);
        }

        if let Some(v) = lookup("API_ADDRESS") {
            self.server.address = v;
        }
        if let Some(v) = parse_var(&lookup, "REQUEST_TIMEOUT_SECS")? {
            self.server.request_timeout_secs = v;
        }

        if let Some(v) = lookup("PROMPTS_DIR") {
            self.prompts_dir = Some(PathBuf::from(v));
        }

        if let Some(v) = lookup("RUST_LOG") {
            self.log_level = Some(v);
        }
        if lookup("NO_COLOR").is_some() {
            self.no_color = true;
        }

        Ok(())
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
    pub fn with_overrides(
        mut self,
        server_type: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(server_type) = server_type {
            self.llm.server_type = server_type.to_uppercase();
        }

        if let Some(model) = model {
            self.llm.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Validate the merged configuration.
    pub fn validate(&self) -> AppResult<()> {
        if !KNOWN_SERVER_TYPES.contains(&self.llm.server_type.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown LLM server type: {}. Supported: {}",
                self.llm.server_type,
                KNOWN_SERVER_TYPES.join(", ")
            )));
        }

        for (name, url) in [
            ("LLM_URL", &self.llm.url),
            ("QDRANT_URL", &self.qdrant.url),
            ("EMBEDDING_URL", &self.embedding.url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(AppError::Config(format!(
                    "{} must start with http:// or https://, got '{}'",
                    name, url
                )));
            }
        }

        if self.retrieval.top_k == 0 {
            return Err(AppError::Config(
                "RETRIEVAL_TOP_K must be greater than zero".to_string(),
            ));
        }

        if self.qdrant.collection.trim().is_empty() {
            return Err(AppError::Config(
                "QDRANT_COLLECTION_NAME cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Parse an optional environment value into `T`.
fn parse_var<T, F>(lookup: &F, key: &str) -> AppResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| AppError::Config(format!("Invalid value for {}: '{}' ({})", key, raw, e))),
        None => Ok(None),
    }
}
