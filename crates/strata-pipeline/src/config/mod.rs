mod env;
mod types;

#[cfg(test)]
mod tests;

pub use types::*;

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use strata_llm::AnyProvider;
use strata_llm::ollama::OllamaProvider;
use strata_llm::openai::OpenAiProvider;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_PATH: &str = "strata.toml";

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or if
    /// the resulting configuration is invalid.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns an error for zero batch sizes or a zero embedding dimension.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (section, size) in [
            ("enrichment", self.enrichment.batch_size),
            ("vectorization", self.vectorization.batch_size),
            ("index", self.index.batch_size),
        ] {
            if size == 0 {
                bail!("{section}.batch_size must be greater than zero");
            }
        }
        if self.vectorization.dimension == Some(0) {
            bail!("vectorization.dimension must be greater than zero");
        }
        if self.index.file_name.trim().is_empty() {
            bail!("index.file_name must not be empty");
        }
        Ok(())
    }

    /// Location the indexing stage saves the vector index to.
    #[must_use]
    pub fn index_path(&self) -> PathBuf {
        self.project
            .resolved_output_dir()
            .join(&self.index.file_name)
    }
}

impl LlmConfig {
    /// Construct the configured provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the OpenAI provider is selected without an API key.
    pub fn build_provider(&self) -> anyhow::Result<AnyProvider> {
        match self.provider {
            ProviderKind::Ollama => Ok(AnyProvider::Ollama(OllamaProvider::new(
                &self.base_url,
                self.model.clone(),
                self.embedding_model.clone(),
            ))),
            ProviderKind::OpenAi => {
                let Some(api_key) = self.api_key.clone() else {
                    bail!("llm.provider = \"openai\" requires STRATA_LLM_API_KEY");
                };
                let provider = OpenAiProvider::new(
                    api_key,
                    self.base_url.clone(),
                    self.model.clone(),
                    self.max_tokens,
                    Some(self.embedding_model.clone()),
                )
                .with_max_retries(self.max_retries);
                Ok(AnyProvider::OpenAi(provider))
            }
        }
    }
}
