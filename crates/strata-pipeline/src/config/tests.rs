use std::io::Write;
use std::path::PathBuf;

use serial_test::serial;

use super::*;

const ENV_KEYS: [&str; 11] = [
    "STRATA_LLM_PROVIDER",
    "STRATA_LLM_BASE_URL",
    "STRATA_LLM_MODEL",
    "STRATA_LLM_EMBEDDING_MODEL",
    "STRATA_LLM_API_KEY",
    "STRATA_ROOT",
    "STRATA_OUTPUT_DIR",
    "STRATA_ENRICHMENT_DELAY_MS",
    "STRATA_VECTORIZATION_DELAY_MS",
    "STRATA_VECTOR_DIMENSION",
    "STRATA_PARSING_AST",
];

fn clear_env() {
    for key in ENV_KEYS {
        unsafe { std::env::remove_var(key) };
    }
}

fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("strata.toml");
    let mut f = std::fs::File::create(&path).unwrap();
    write!(f, "{content}").unwrap();
    (dir, path)
}

#[test]
fn defaults() {
    let config = Config::default();
    assert_eq!(config.project.root, PathBuf::from("."));
    assert_eq!(config.enrichment.batch_size, 5);
    assert_eq!(config.enrichment.delay_ms, 1000);
    assert_eq!(config.vectorization.batch_size, 10);
    assert_eq!(config.vectorization.dimension, None);
    assert_eq!(config.index.batch_size, 100);
    assert_eq!(config.llm.provider, ProviderKind::Ollama);
    assert_eq!(config.llm.base_url, "http://localhost:11434");
    assert!(config.parsing.ast);
    assert!(config.project.include.contains(&"**/*.go".to_owned()));
    assert_eq!(config.index_path(), PathBuf::from("./.strata/index.json"));
}

#[test]
#[serial]
fn missing_file_falls_back_to_defaults() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config.enrichment.batch_size, 5);
}

#[test]
#[serial]
fn parse_valid_toml() {
    let (_dir, path) = write_config(
        r#"
[project]
root = "/srv/repo"
output_dir = "/tmp/strata-out"
exclude = ["gen/big.go"]

[enrichment]
batch_size = 3
delay_ms = 0

[vectorization]
dimension = 768

[llm]
provider = "openai"
base_url = "https://api.openai.com/v1"
model = "gpt-4o-mini"
"#,
    );
    clear_env();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.project.root, PathBuf::from("/srv/repo"));
    assert_eq!(config.project.exclude, [PathBuf::from("gen/big.go")]);
    assert_eq!(config.enrichment.batch_size, 3);
    assert_eq!(config.enrichment.delay_ms, 0);
    assert_eq!(config.enrichment.max_code_chars, 4000);
    assert_eq!(config.vectorization.dimension, Some(768));
    assert_eq!(config.llm.provider, ProviderKind::OpenAi);
    assert_eq!(config.llm.embedding_model, "nomic-embed-text");
    assert_eq!(
        config.index_path(),
        PathBuf::from("/tmp/strata-out/index.json")
    );
}

#[test]
#[serial]
fn malformed_toml_is_an_error() {
    let (_dir, path) = write_config("[enrichment\nbatch_size = 3");
    clear_env();
    assert!(Config::load(&path).is_err());
}

#[test]
#[serial]
fn zero_batch_size_is_rejected() {
    let (_dir, path) = write_config("[vectorization]\nbatch_size = 0\n");
    clear_env();
    let err = Config::load(&path).unwrap_err();
    assert!(err.to_string().contains("vectorization.batch_size"));
}

#[test]
#[serial]
fn env_overrides() {
    clear_env();
    unsafe {
        std::env::set_var("STRATA_LLM_PROVIDER", "openai");
        std::env::set_var("STRATA_LLM_MODEL", "gpt-4o");
        std::env::set_var("STRATA_LLM_API_KEY", "sk-test");
        std::env::set_var("STRATA_ROOT", "/work");
        std::env::set_var("STRATA_ENRICHMENT_DELAY_MS", "250");
        std::env::set_var("STRATA_VECTOR_DIMENSION", "384");
        std::env::set_var("STRATA_PARSING_AST", "false");
    }

    let mut config = Config::default();
    config.apply_env_overrides();
    clear_env();

    assert_eq!(config.llm.provider, ProviderKind::OpenAi);
    assert_eq!(config.llm.model, "gpt-4o");
    assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
    assert_eq!(config.project.root, PathBuf::from("/work"));
    assert_eq!(config.enrichment.delay_ms, 250);
    assert_eq!(config.vectorization.dimension, Some(384));
    assert!(!config.parsing.ast);
}

#[test]
#[serial]
fn invalid_env_values_are_ignored() {
    clear_env();
    unsafe {
        std::env::set_var("STRATA_LLM_PROVIDER", "unknown");
        std::env::set_var("STRATA_ENRICHMENT_DELAY_MS", "soon");
    }

    let mut config = Config::default();
    config.apply_env_overrides();
    clear_env();

    assert_eq!(config.llm.provider, ProviderKind::Ollama);
    assert_eq!(config.enrichment.delay_ms, 1000);
}

#[test]
#[serial]
fn zero_dimension_from_env_is_rejected() {
    clear_env();
    unsafe { std::env::set_var("STRATA_VECTOR_DIMENSION", "0") };
    let dir = tempfile::tempdir().unwrap();
    let result = Config::load(&dir.path().join("absent.toml"));
    clear_env();
    assert!(result.is_err());
}

#[test]
fn openai_requires_api_key() {
    let mut llm = LlmConfig {
        provider: ProviderKind::OpenAi,
        ..LlmConfig::default()
    };
    assert!(llm.build_provider().is_err());
    llm.api_key = Some("sk-test".into());
    assert!(matches!(
        llm.build_provider().unwrap(),
        strata_llm::AnyProvider::OpenAi(_)
    ));
}

#[test]
fn api_key_is_redacted_and_not_serialized() {
    let llm = LlmConfig {
        api_key: Some("sk-secret".into()),
        ..LlmConfig::default()
    };
    assert!(!format!("{llm:?}").contains("sk-secret"));
    let toml = toml::to_string(&llm).unwrap();
    assert!(!toml.contains("sk-secret"));
}
