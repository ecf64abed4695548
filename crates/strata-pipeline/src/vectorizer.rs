use strata_llm::{LlmError, LlmProvider};
use tokio::sync::OnceCell;

use crate::BoxFuture;
use crate::error::CollaboratorError;

const PROBE_TEXT: &str = "dimension probe";

pub trait Vectorizer: Send + Sync {
    /// Fix the embedding dimension. Idempotent: later calls return the same value.
    fn initialize(&self) -> BoxFuture<'_, Result<usize, CollaboratorError>>;

    /// Dimension fixed by [`Vectorizer::initialize`], if it has run.
    fn dimension(&self) -> Option<usize>;

    /// One vector per text, in input order.
    fn create_embeddings<'a>(
        &'a self,
        texts: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<Vec<f32>>, CollaboratorError>>;
}

/// Vectorizer backed by an embedding model.
///
/// Without a configured dimension, the first [`Vectorizer::initialize`] embeds
/// a probe text and adopts its length.
#[derive(Debug)]
pub struct LlmVectorizer<P> {
    provider: P,
    configured: Option<usize>,
    dimension: OnceCell<usize>,
}

impl<P: LlmProvider> LlmVectorizer<P> {
    #[must_use]
    pub fn new(provider: P, dimension: Option<usize>) -> Self {
        Self {
            provider,
            configured: dimension,
            dimension: OnceCell::new(),
        }
    }

    async fn probe(&self) -> Result<usize, CollaboratorError> {
        if !self.provider.supports_embeddings() {
            return Err(LlmError::EmbedUnsupported {
                provider: self.provider.name(),
            }
            .into());
        }
        if let Some(dim) = self.configured {
            return Ok(dim);
        }
        let probe = self.provider.embed_batch(&[PROBE_TEXT.to_owned()]).await?;
        match probe.first().map(Vec::len) {
            Some(dim) if dim > 0 => {
                tracing::debug!(provider = self.provider.name(), dim, "probed embedding dimension");
                Ok(dim)
            }
            _ => Err(CollaboratorError::Other(format!(
                "{} returned an empty probe embedding",
                self.provider.name()
            ))),
        }
    }
}

impl<P: LlmProvider> Vectorizer for LlmVectorizer<P> {
    fn initialize(&self) -> BoxFuture<'_, Result<usize, CollaboratorError>> {
        Box::pin(async move {
            self.dimension
                .get_or_try_init(|| self.probe())
                .await
                .copied()
        })
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension.get().copied()
    }

    fn create_embeddings<'a>(
        &'a self,
        texts: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<Vec<f32>>, CollaboratorError>> {
        Box::pin(async move {
            let expected = self.initialize().await?;
            if texts.is_empty() {
                return Ok(Vec::new());
            }
            let vectors = self.provider.embed_batch(texts).await?;
            if vectors.len() != texts.len() {
                return Err(CollaboratorError::LengthMismatch {
                    expected: texts.len(),
                    actual: vectors.len(),
                });
            }
            if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
                return Err(CollaboratorError::DimensionMismatch {
                    expected,
                    actual: bad.len(),
                });
            }
            Ok(vectors)
        })
    }
}
