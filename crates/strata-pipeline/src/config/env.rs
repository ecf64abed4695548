use std::path::PathBuf;

use super::Config;

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("STRATA_LLM_PROVIDER") {
            if let Ok(kind) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.llm.provider = kind;
            } else {
                tracing::warn!("ignoring invalid STRATA_LLM_PROVIDER value: {v}");
            }
        }
        if let Ok(v) = std::env::var("STRATA_LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("STRATA_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("STRATA_LLM_EMBEDDING_MODEL") {
            self.llm.embedding_model = v;
        }
        if let Ok(v) = std::env::var("STRATA_LLM_API_KEY") {
            self.llm.api_key = Some(v);
        }
        if let Ok(v) = std::env::var("STRATA_ROOT") {
            self.project.root = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("STRATA_OUTPUT_DIR") {
            self.project.output_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("STRATA_ENRICHMENT_DELAY_MS")
            && let Ok(ms) = v.parse::<u64>()
        {
            self.enrichment.delay_ms = ms;
        }
        if let Ok(v) = std::env::var("STRATA_VECTORIZATION_DELAY_MS")
            && let Ok(ms) = v.parse::<u64>()
        {
            self.vectorization.delay_ms = ms;
        }
        if let Ok(v) = std::env::var("STRATA_VECTOR_DIMENSION")
            && let Ok(dim) = v.parse::<usize>()
        {
            self.vectorization.dimension = Some(dim);
        }
        if let Ok(v) = std::env::var("STRATA_PARSING_AST")
            && let Ok(ast) = v.parse::<bool>()
        {
            self.parsing.ast = ast;
        }
    }
}
