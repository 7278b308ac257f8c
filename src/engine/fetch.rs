use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

use crate::config::SuiteConfig;
use crate::domain::{ApiErrorBody, CadResponse, status};
use crate::error::{CadError, Result};
use crate::http::{ApiResponse, CadClient, CadQuery};
use crate::observe::Observer;

use super::retry::RetryPolicy;

/// Calls `request_fn` under `policy` until it returns `expected_status` with a
/// JSON body, and returns that body.
pub async fn fetch_with<F, Fut>(
    mut request_fn: F,
    expected_status: u16,
    policy: &RetryPolicy,
    observer: &dyn Observer,
) -> Result<Value>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<ApiResponse>>,
{
    policy
        .run(observer, |_| {
            let pending = request_fn();
            async move {
                let response = pending.await?;
                expect_status(&response, expected_status)?;
                response.value()
            }
        })
        .await
}

pub fn expect_status(response: &ApiResponse, expected: u16) -> Result<()> {
    if response.status != expected {
        return Err(CadError::UnexpectedStatus {
            expected,
            actual: response.status,
            body: response.body.clone(),
        });
    }
    Ok(())
}

/// Client, retry policy and observer bundled for the conformance checks.
#[derive(Clone)]
pub struct CadFetcher {
    client: CadClient,
    policy: RetryPolicy,
    observer: Arc<dyn Observer>,
}

impl CadFetcher {
    pub fn new(client: CadClient, policy: RetryPolicy, observer: Arc<dyn Observer>) -> Self {
        Self {
            client,
            policy,
            observer,
        }
    }

    pub fn from_config(config: &SuiteConfig, observer: Arc<dyn Observer>) -> Result<Self> {
        config.validate()?;
        let client = CadClient::new(&config.http)?;
        Ok(Self::new(client, config.retry_policy(), observer))
    }

    pub fn client(&self) -> &CadClient {
        &self.client
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn observer(&self) -> &dyn Observer {
        self.observer.as_ref()
    }

    pub async fn fetch(&self, query: &CadQuery, expected_status: u16) -> Result<Value> {
        query.validate()?;
        fetch_with(
            || self.client.get(query),
            expected_status,
            &self.policy,
            self.observer.as_ref(),
        )
        .await
    }

    /// Fetches expecting `expected_status` and decodes the body as a
    /// close-approach response.
    pub async fn fetch_response(&self, query: &CadQuery, expected_status: u16) -> Result<CadResponse> {
        let body = self.fetch(query, expected_status).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Shorthand for [`CadFetcher::fetch_response`] expecting `200 OK`.
    pub async fn fetch_data(&self, query: &CadQuery) -> Result<CadResponse> {
        self.fetch_response(query, status::OK).await
    }

    /// Fetches with the expectation of an error status and decodes the error body.
    pub async fn fetch_error(&self, query: &CadQuery, expected_status: u16) -> Result<ApiErrorBody> {
        let body = self.fetch(query, expected_status).await?;
        Ok(serde_json::from_value(body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::RecordingObserver;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn response(status: u16, body: &str) -> ApiResponse {
        ApiResponse {
            status,
            duration_ms: 1,
            size_bytes: body.len(),
            body: body.to_string(),
        }
    }

    #[tokio::test]
    async fn matching_status_returns_body_on_first_call() {
        let calls = AtomicU32::new(0);
        let body = fetch_with(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(response(200, r#"{"count":0}"#)) }
            },
            200,
            &RetryPolicy::single_attempt(),
            &RecordingObserver::new(),
        )
        .await
        .expect("body");

        assert_eq!(body["count"], 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn status_mismatch_is_retried_then_surfaced() {
        let calls = AtomicU32::new(0);
        let observer = RecordingObserver::new();
        let err = fetch_with(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(response(503, "")) }
            },
            200,
            &RetryPolicy::new(3, Duration::ZERO),
            &observer,
        )
        .await
        .expect_err("mismatch");

        assert!(matches!(
            err,
            CadError::UnexpectedStatus {
                expected: 200,
                actual: 503,
                ..
            }
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(observer.retries(), 2);
    }

    #[tokio::test]
    async fn expected_error_status_is_a_success() {
        let body = fetch_with(
            || async {
                Ok(response(
                    400,
                    r#"{"message":"one or more query parameter was not recognized"}"#,
                ))
            },
            400,
            &RetryPolicy::single_attempt(),
            &RecordingObserver::new(),
        )
        .await
        .expect("400 body");

        assert!(body["message"].as_str().is_some_and(|msg| msg.contains("not recognized")));
    }

    #[tokio::test]
    async fn unparsable_body_recovers_on_retry() {
        let calls = AtomicU32::new(0);
        let body = fetch_with(
            || {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call == 0 {
                        Ok(response(200, "<html>"))
                    } else {
                        Ok(response(200, r#"{"count":1}"#))
                    }
                }
            },
            200,
            &RetryPolicy::new(2, Duration::ZERO),
            &RecordingObserver::new(),
        )
        .await
        .expect("second body");

        assert_eq!(body["count"], 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
