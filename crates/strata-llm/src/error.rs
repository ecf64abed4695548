//! Errors raised by LLM providers.

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid provider payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rate limited")]
    RateLimited,

    #[error("{provider} returned no content")]
    EmptyResponse { provider: &'static str },

    #[error("{provider} has no embedding model configured")]
    EmbedUnsupported { provider: &'static str },

    #[error("{provider} answered with HTTP {status}")]
    Status {
        provider: &'static str,
        status: u16,
    },

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, LlmError>;
