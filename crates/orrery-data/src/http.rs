//! Shared HTTP plumbing for the remote astronomy services

use reqwest::Client;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::ServiceConfig;
use crate::error::ServiceError;

/// Bounded retry with linear backoff
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }

    /// Wait before the attempt following `attempt` (1-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ServiceConfig::default())
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// attempts run out
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                let delay = policy.delay(attempt);
                tracing::warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {:?}",
                    label, attempt, policy.max_attempts, e, delay
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// A named service endpoint with timeout and retry applied to every call
#[derive(Clone, Debug)]
pub struct HttpService {
    name: &'static str,
    url: String,
    http: Client,
    retry: RetryPolicy,
}

impl HttpService {
    pub fn new(name: &'static str, url: impl Into<String>, config: &ServiceConfig) -> Result<Self, ServiceError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("orrery/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            name,
            url: url.into(),
            http,
            retry: RetryPolicy::from_config(config),
        })
    }

    /// GET the endpoint with query parameters and return the body text
    pub async fn get_text(&self, params: &[(&str, String)]) -> Result<String, ServiceError> {
        with_retry(&self.retry, self.name, || self.get_once(params)).await
    }

    async fn get_once(&self, params: &[(&str, String)]) -> Result<String, ServiceError> {
        let response = self.http.get(&self.url).query(params).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Status {
                service: self.name,
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick(max_attempts: u32) -> RetryPolicy {
        RetryPolicy { max_attempts, backoff: Duration::ZERO }
    }

    fn unavailable() -> ServiceError {
        ServiceError::Status { service: "test", status: 503, body: String::new() }
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = with_retry(&quick(3), "flaky", move || async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(unavailable())
            } else {
                Ok(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = with_retry(&quick(3), "down", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(unavailable())
        })
        .await;

        assert!(matches!(result, Err(ServiceError::Status { status: 503, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_semantic_errors_fail_fast() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = with_retry(&quick(3), "remote", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(ServiceError::Remote { service: "test", message: "no match".into() })
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_linear_backoff() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay(1), Duration::from_millis(500));
        assert_eq!(policy.delay(2), Duration::from_millis(1000));
    }
}
