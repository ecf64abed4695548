//! Test-only scripted provider.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::error::LlmError;
use crate::provider::{LlmProvider, Message};

/// Scripted chat responses, deterministic embeddings, and failure injection.
///
/// Clones share their call logs and scripts.
#[derive(Debug, Clone)]
pub struct MockProvider {
    responses: Arc<Mutex<Vec<String>>>,
    pub default_response: String,
    pub dimension: usize,
    pub supports_embeddings: bool,
    pub fail_chat: bool,
    /// Zero-based embedding call indices that fail.
    fail_embed_calls: Arc<Mutex<HashSet<usize>>>,
    /// Zero-based embedding call indices that return one vector too few.
    short_embed_calls: Arc<Mutex<HashSet<usize>>>,
    chat_log: Arc<Mutex<Vec<Vec<Message>>>>,
    embed_log: Arc<Mutex<Vec<usize>>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            default_response: "mock response".into(),
            dimension: 8,
            supports_embeddings: true,
            fail_chat: false,
            fail_embed_calls: Arc::default(),
            short_embed_calls: Arc::default(),
            chat_log: Arc::default(),
            embed_log: Arc::default(),
        }
    }
}

impl MockProvider {
    #[must_use]
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_chat: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    #[must_use]
    pub fn without_embeddings(mut self) -> Self {
        self.supports_embeddings = false;
        self
    }

    /// Make the `call`-th `embed_batch` invocation fail.
    #[must_use]
    pub fn fail_embed_call(self, call: usize) -> Self {
        self.fail_embed_calls.lock().unwrap().insert(call);
        self
    }

    /// Make the `call`-th `embed_batch` invocation return too few vectors.
    #[must_use]
    pub fn short_embed_call(self, call: usize) -> Self {
        self.short_embed_calls.lock().unwrap().insert(call);
        self
    }

    /// Every message list passed to `chat`, in call order.
    #[must_use]
    pub fn chat_calls(&self) -> Vec<Vec<Message>> {
        self.chat_log.lock().unwrap().clone()
    }

    /// Batch size of every `embed_batch` call, in call order.
    #[must_use]
    pub fn embed_calls(&self) -> Vec<usize> {
        self.embed_log.lock().unwrap().clone()
    }

    /// The vector this provider returns for `text`. Never all zeros.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn embedding_for(&self, text: &str) -> Vec<f32> {
        let seed: usize = text.bytes().map(usize::from).sum();
        (0..self.dimension)
            .map(|i| ((seed + i) % 7 + 1) as f32 / 7.0)
            .collect()
    }
}

impl LlmProvider for MockProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.chat_log.lock().unwrap().push(messages.to_vec());
        if self.fail_chat {
            return Err(LlmError::Other("mock LLM error".into()));
        }
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(self.default_response.clone())
        } else {
            Ok(responses.remove(0))
        }
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        if !self.supports_embeddings {
            return Err(LlmError::EmbedUnsupported { provider: "mock" });
        }
        let call = {
            let mut log = self.embed_log.lock().unwrap();
            log.push(texts.len());
            log.len() - 1
        };
        if self.fail_embed_calls.lock().unwrap().contains(&call) {
            return Err(LlmError::Other(format!("mock embedding failure on call {call}")));
        }
        let mut vectors: Vec<Vec<f32>> = texts.iter().map(|t| self.embedding_for(t)).collect();
        if self.short_embed_calls.lock().unwrap().contains(&call) {
            vectors.pop();
        }
        Ok(vectors)
    }

    fn supports_embeddings(&self) -> bool {
        self.supports_embeddings
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_responses_then_default() {
        let mock = MockProvider::with_responses(vec!["first".into()]);
        assert_eq!(mock.chat(&[Message::user("a")]).await.unwrap(), "first");
        assert_eq!(mock.chat(&[Message::user("b")]).await.unwrap(), "mock response");
        assert_eq!(mock.chat_calls().len(), 2);
    }

    #[tokio::test]
    async fn injected_embedding_failures_by_call_index() {
        let mock = MockProvider::default().with_dimension(3).fail_embed_call(1);
        let texts = vec!["x".to_string(), "y".to_string()];
        assert_eq!(mock.embed_batch(&texts).await.unwrap().len(), 2);
        assert!(mock.embed_batch(&texts).await.is_err());
        let third = mock.embed_batch(&texts[..1]).await.unwrap();
        assert_eq!(third[0].len(), 3);
        assert_eq!(mock.embed_calls(), vec![2, 2, 1]);
    }

    #[test]
    fn embeddings_are_never_zero() {
        let mock = MockProvider::default();
        assert!(mock.embedding_for("").iter().all(|v| *v > 0.0));
    }
}
