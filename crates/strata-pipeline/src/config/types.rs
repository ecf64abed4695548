use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::discovery::{DEFAULT_IGNORES, DEFAULT_PATTERNS};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub parsing: ParsingConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub vectorization: VectorizationConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".strata")
}

fn default_patterns() -> Vec<String> {
    DEFAULT_PATTERNS.iter().map(ToString::to_string).collect()
}

fn default_ignores() -> Vec<String> {
    DEFAULT_IGNORES.iter().map(ToString::to_string).collect()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProjectConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Relative paths resolve against `root`.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_patterns")]
    pub include: Vec<String>,
    #[serde(default = "default_ignores")]
    pub ignore: Vec<String>,
    /// Explicit selection; overrides `include` when non-empty.
    #[serde(default)]
    pub files: Vec<PathBuf>,
    #[serde(default)]
    pub exclude: Vec<PathBuf>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            output_dir: default_output_dir(),
            include: default_patterns(),
            ignore: default_ignores(),
            files: Vec::new(),
            exclude: Vec::new(),
        }
    }
}

impl ProjectConfig {
    /// `output_dir`, anchored at `root` when relative.
    #[must_use]
    pub fn resolved_output_dir(&self) -> PathBuf {
        if self.output_dir.is_absolute() {
            self.output_dir.clone()
        } else {
            self.root.join(&self.output_dir)
        }
    }
}

fn default_ast() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ParsingConfig {
    /// Use tree-sitter grammars when available; `false` forces the regex fallback.
    #[serde(default = "default_ast")]
    pub ast: bool,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self { ast: default_ast() }
    }
}

fn default_enrichment_batch_size() -> usize {
    5
}

fn default_enrichment_delay_ms() -> u64 {
    1000
}

fn default_max_code_chars() -> usize {
    4000
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EnrichmentConfig {
    #[serde(default = "default_enrichment_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_enrichment_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_max_code_chars")]
    pub max_code_chars: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            batch_size: default_enrichment_batch_size(),
            delay_ms: default_enrichment_delay_ms(),
            max_code_chars: default_max_code_chars(),
        }
    }
}

fn default_vectorization_batch_size() -> usize {
    10
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VectorizationConfig {
    #[serde(default = "default_vectorization_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub delay_ms: u64,
    /// Fixed embedding dimension; probed from the provider when unset.
    #[serde(default)]
    pub dimension: Option<usize>,
}

impl Default for VectorizationConfig {
    fn default() -> Self {
        Self {
            batch_size: default_vectorization_batch_size(),
            delay_ms: 0,
            dimension: None,
        }
    }
}

fn default_index_batch_size() -> usize {
    100
}

fn default_index_file() -> String {
    "index.json".into()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    #[serde(default = "default_index_batch_size")]
    pub batch_size: usize,
    /// File name inside `project.output_dir`.
    #[serde(default = "default_index_file")]
    pub file_name: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            batch_size: default_index_batch_size(),
            file_name: default_index_file(),
        }
    }
}

/// LLM provider backend selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Ollama,
    OpenAi,
}

fn default_base_url() -> String {
    "http://localhost:11434".into()
}

fn default_model() -> String {
    "qwen3:8b".into()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".into()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_max_retries() -> u32 {
    3
}

#[derive(Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Read from `STRATA_LLM_API_KEY`; never written back to disk.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            base_url: default_base_url(),
            model: default_model(),
            embedding_model: default_embedding_model(),
            max_tokens: default_max_tokens(),
            max_retries: default_max_retries(),
            api_key: None,
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("embedding_model", &self.embedding_model)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
