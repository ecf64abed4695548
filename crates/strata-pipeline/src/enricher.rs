//! L2 semantic enrichment: description, summary and tags per item.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use strata_llm::{LlmProvider, Message};
use strata_parse::AiItem;

use crate::BoxFuture;
use crate::error::CollaboratorError;

/// Prefix of the text stored for items whose enrichment failed.
pub const ENRICHMENT_FAILED: &str = "[enrichment failed]";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrichment {
    pub description: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Enrichment {
    /// Sentinel enrichment carrying `reason`.
    #[must_use]
    pub fn failed(reason: impl std::fmt::Display) -> Self {
        let text = format!("{ENRICHMENT_FAILED} {reason}");
        Self {
            description: text.clone(),
            summary: text,
            tags: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.description.starts_with(ENRICHMENT_FAILED)
    }
}

pub trait SemanticEnricher: Send + Sync {
    /// One enrichment per input item, in input order.
    fn enrich_batch<'a>(
        &'a self,
        items: &'a [AiItem],
    ) -> BoxFuture<'a, Result<Vec<Enrichment>, CollaboratorError>>;
}

const SYSTEM_PROMPT: &str = "You document source code. For every numbered construct \
you receive, write a one-paragraph description of what it does, a one-sentence summary, \
and up to five lowercase topic tags. Reply with only a JSON array containing one object \
per construct, in input order, each shaped as \
{\"description\": string, \"summary\": string, \"tags\": [string]}.";

/// Enricher backed by a chat model; one request per batch.
#[derive(Debug, Clone)]
pub struct LlmEnricher<P> {
    provider: P,
    max_code_chars: usize,
}

impl<P: LlmProvider> LlmEnricher<P> {
    #[must_use]
    pub fn new(provider: P, max_code_chars: usize) -> Self {
        Self {
            provider,
            max_code_chars,
        }
    }

    fn prompt(&self, items: &[AiItem]) -> String {
        let mut prompt = String::new();
        for (i, item) in items.iter().enumerate() {
            let _ = writeln!(
                prompt,
                "## {} {} `{}` ({}, {})",
                i + 1,
                item.item_type,
                item.name,
                item.language.id(),
                item.file_path
            );
            if !item.l1_deps.is_empty() {
                let deps: Vec<&str> = item.l1_deps.iter().map(|d| d.name.as_str()).collect();
                let _ = writeln!(prompt, "Depends on: {}", deps.join(", "));
            }
            let _ = writeln!(
                prompt,
                "```\n{}\n```\n",
                truncate_chars(&item.l0_code, self.max_code_chars)
            );
        }
        prompt
    }
}

impl<P: LlmProvider> SemanticEnricher for LlmEnricher<P> {
    fn enrich_batch<'a>(
        &'a self,
        items: &'a [AiItem],
    ) -> BoxFuture<'a, Result<Vec<Enrichment>, CollaboratorError>> {
        Box::pin(async move {
            if items.is_empty() {
                return Ok(Vec::new());
            }
            let messages = [Message::system(SYSTEM_PROMPT), Message::user(self.prompt(items))];
            let response = self.provider.chat(&messages).await?;
            parse_response(&response)
        })
    }
}

/// Parse a chat reply into enrichments.
///
/// Non-array replies fail the batch. Elements that do not deserialize become
/// sentinels so the rest of the batch survives.
///
/// # Errors
///
/// Returns [`CollaboratorError::Other`] when no JSON array can be found.
pub fn parse_response(response: &str) -> Result<Vec<Enrichment>, CollaboratorError> {
    let body = extract_array(response).ok_or_else(|| {
        CollaboratorError::Other("enrichment response contains no JSON array".into())
    })?;
    let values: Vec<serde_json::Value> = serde_json::from_str(body)?;
    Ok(values
        .into_iter()
        .enumerate()
        .map(|(i, value)| {
            serde_json::from_value(value).unwrap_or_else(|e| {
                tracing::debug!(entry = i, "unparseable enrichment entry: {e}");
                Enrichment::failed(format!("unparseable response entry: {e}"))
            })
        })
        .collect())
}

fn extract_array(response: &str) -> Option<&str> {
    let start = response.find('[')?;
    let end = response.rfind(']')?;
    (end > start).then(|| &response[start..=end])
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use strata_llm::mock::MockProvider;
    use strata_parse::ParserDispatcher;

    use super::*;

    fn items() -> Vec<AiItem> {
        ParserDispatcher::default()
            .parser_for(std::path::Path::new("calc.py"))
            .unwrap()
            .parse_source(
                "def add(a, b):\n    return a + b\n\n\ndef sub(a, b):\n    return a - b\n",
                "calc.py",
            )
    }

    #[test]
    fn fenced_array_is_parsed() {
        let reply = "Sure:\n```json\n[{\"description\": \"adds\", \"summary\": \"a+b\", \"tags\": [\"math\"]}]\n```";
        let parsed = parse_response(reply).unwrap();
        assert_eq!(
            parsed,
            [Enrichment {
                description: "adds".into(),
                summary: "a+b".into(),
                tags: vec!["math".into()],
            }]
        );
    }

    #[test]
    fn bad_entries_degrade_individually() {
        let parsed = parse_response(r#"[{"description": "ok"}, 42, {"summary": "no desc"}]"#).unwrap();
        assert_eq!(parsed.len(), 3);
        assert!(!parsed[0].is_failed());
        assert!(parsed[0].tags.is_empty());
        assert!(parsed[1].is_failed());
        assert!(parsed[2].is_failed());
    }

    #[test]
    fn non_array_response_fails() {
        assert!(parse_response("{\"description\": \"x\"}").is_err());
        assert!(parse_response("I cannot help with that.").is_err());
        assert!(matches!(parse_response("[1, 2"), Err(_)));
    }

    #[test]
    fn failed_enrichment_carries_reason() {
        let e = Enrichment::failed("timeout");
        assert_eq!(e.description, "[enrichment failed] timeout");
        assert_eq!(e.summary, e.description);
        assert!(e.is_failed());
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[tokio::test]
    async fn one_chat_request_per_batch() {
        let provider = MockProvider::with_responses(vec![
            r#"[{"description": "adds", "summary": "s1"}, {"description": "subtracts", "summary": "s2"}]"#
                .into(),
        ]);
        let enricher = LlmEnricher::new(provider.clone(), 8);
        let out = enricher.enrich_batch(&items()).await.unwrap();
        assert_eq!(out[0].description, "adds");
        assert_eq!(out[1].description, "subtracts");

        let calls = provider.chat_calls();
        assert_eq!(calls.len(), 1);
        let user = &calls[0][1].content;
        assert!(user.contains("## 1 function `add`"));
        assert!(user.contains("## 2 function `sub`"));
        assert!(user.contains("def add("), "code truncated to 8 chars: {user}");
        assert!(!user.contains("return a + b"));
    }

    #[tokio::test]
    async fn provider_error_fails_batch() {
        let enricher = LlmEnricher::new(MockProvider::failing(), 100);
        assert!(matches!(
            enricher.enrich_batch(&items()).await,
            Err(CollaboratorError::Llm(_))
        ));
    }

    #[tokio::test]
    async fn empty_batch_skips_request() {
        let provider = MockProvider::default();
        let enricher = LlmEnricher::new(provider.clone(), 100);
        assert!(enricher.enrich_batch(&[]).await.unwrap().is_empty());
        assert!(provider.chat_calls().is_empty());
    }
}
