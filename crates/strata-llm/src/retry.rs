use std::future::Future;
use std::time::Duration;

use crate::error::LlmError;
use crate::provider::StatusTx;

/// How often and how long to back off on `429 Too Many Requests`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RetryPolicy {
    pub max_retries: u32,
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// `Retry-After` seconds when present, else `base_backoff * 2^attempt`.
    fn delay(&self, retry_after: Option<&str>, attempt: u32) -> Duration {
        if let Some(secs) = retry_after.and_then(|v| v.trim().parse::<u64>().ok()) {
            return Duration::from_secs(secs);
        }
        self.base_backoff
            .saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX))
    }
}

/// Send a request built by `f`, re-sending it on 429 responses.
///
/// The first non-429 response is returned as-is for the caller to inspect.
///
/// # Errors
///
/// Returns `LlmError::RateLimited` once every attempt was rate limited, or
/// `LlmError::Http` for transport failures.
pub(crate) async fn send_with_retry<F, Fut>(
    provider: &str,
    policy: RetryPolicy,
    status_tx: Option<&StatusTx>,
    mut f: F,
) -> Result<reqwest::Response, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    for attempt in 0..=policy.max_retries {
        let response = f().await?;
        if response.status() != reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Ok(response);
        }
        if attempt == policy.max_retries {
            break;
        }

        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok());
        let delay = policy.delay(retry_after, attempt);
        let msg = format!(
            "{provider} rate limited, retrying in {}s ({}/{})",
            delay.as_secs(),
            attempt + 1,
            policy.max_retries
        );
        if let Some(tx) = status_tx {
            let _ = tx.send(msg.clone());
        }
        tracing::warn!("{msg}");
        tokio::time::sleep(delay).await;
    }

    Err(LlmError::RateLimited)
}
