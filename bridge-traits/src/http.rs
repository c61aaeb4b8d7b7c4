//! HTTP Client Abstraction
//!
//! Requests against the OAuth token endpoint, and the bearer-authorized
//! Docs/Drive calls downstream code makes with an authorized client.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{BridgeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

/// Outgoing request, assembled with the builder methods.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set `Authorization: Bearer <token>`.
    pub fn bearer_token(self, token: impl Into<String>) -> Self {
        self.header("Authorization", format!("Bearer {}", token.into()))
    }

    /// Ask for a JSON response.
    pub fn accept_json(self) -> Self {
        self.header("Accept", "application/json")
    }

    /// Serialize `body` as JSON.
    pub fn json<T: Serialize + ?Sized>(self, body: &T) -> Result<Self> {
        let json = serde_json::to_vec(body).map_err(|e| {
            BridgeError::OperationFailed(format!("JSON serialization failed: {}", e))
        })?;
        Ok(self
            .header("Content-Type", "application/json")
            .body(Bytes::from(json)))
    }

    /// Serialize `params` as `application/x-www-form-urlencoded`, the body
    /// format OAuth token endpoints expect.
    pub fn form<T: Serialize + ?Sized>(self, params: &T) -> Result<Self> {
        let encoded = serde_urlencoded::to_string(params).map_err(|e| {
            BridgeError::OperationFailed(format!("Form encoding failed: {}", e))
        })?;
        Ok(self
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Bytes::from(encoded)))
    }

    pub fn body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }
}

#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            BridgeError::OperationFailed(format!("JSON deserialization failed: {}", e))
        })
    }

    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| BridgeError::OperationFailed(format!("Invalid UTF-8: {}", e)))
    }

    /// Body as text for error messages, lossy on invalid UTF-8.
    pub fn error_text(&self) -> String {
        if self.body.is_empty() {
            "<empty body>".to_string()
        } else {
            String::from_utf8_lossy(&self.body).into_owned()
        }
    }

    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 4xx
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// Statuses worth retrying: 429 and 5xx.
    pub fn is_retryable(&self) -> bool {
        self.status == 429 || (500..600).contains(&self.status)
    }

    /// Server-requested delay from an integer `Retry-After`, capped at `max`.
    pub fn retry_after(&self, max: Duration) -> Option<Duration> {
        let seconds = self.header("Retry-After")?.trim().parse::<u64>().ok()?;
        Some(Duration::from_secs(seconds).min(max))
    }
}

/// Exponential backoff settings for retried requests.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each further attempt
    pub base_delay: Duration,
    /// Upper bound for a single delay
    pub max_delay: Duration,
    /// Retry 429 responses. When false every 4xx is final.
    pub retry_rate_limited: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            retry_rate_limited: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that sends the request exactly once.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Same policy, but treating 429 like any other client error.
    pub fn without_rate_limit_retry(self) -> Self {
        Self {
            retry_rate_limited: false,
            ..self
        }
    }

    /// Whether `response` should be sent again under this policy.
    pub fn retries(&self, response: &HttpResponse) -> bool {
        match response.status {
            429 => self.retry_rate_limited,
            _ => response.is_retryable(),
        }
    }

    /// Whether another attempt is allowed after `attempt` (1-based) failed.
    pub fn allows_retry_after(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Delay to wait after failed attempt `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Async HTTP client.
///
/// Implementations own transport concerns: TLS, pooling and timeouts.
/// Authorization code exchange is not idempotent, so retrying is opt-in
/// through [`execute_with_retry`](HttpClient::execute_with_retry).
///
/// # Example
///
/// ```ignore
/// use bridge_traits::http::{HttpClient, HttpRequest, HttpMethod};
///
/// async fn fetch_document(client: &dyn HttpClient, token: &str) -> Result<String> {
///     let request = HttpRequest::new(HttpMethod::Get, "https://docs.googleapis.com/v1/documents/abc")
///         .bearer_token(token);
///
///     let response = client.execute(request).await?;
///     response.text()
/// }
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Send a request once.
    ///
    /// # Errors
    ///
    /// Transport failures only: connection, TLS, timeout. Non-2xx statuses
    /// come back as responses.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// Send a request, retrying transport failures and the statuses `policy`
    /// [retries](RetryPolicy::retries), with exponential backoff or the
    /// server's `Retry-After`.
    ///
    /// Returns the first non-retryable outcome, or the last one once
    /// `policy.max_attempts` is used up.
    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        let mut attempt = 0;

        loop {
            attempt += 1;
            let outcome = self.execute(request.clone()).await;

            let delay = match &outcome {
                Ok(response) if policy.retries(response) => {
                    warn!(status = response.status, attempt, "Retryable HTTP status");
                    Some(
                        response
                            .retry_after(policy.max_delay)
                            .unwrap_or_else(|| policy.delay_for(attempt)),
                    )
                }
                Ok(_) => None,
                Err(e) => {
                    warn!(error = %e, attempt, "HTTP request failed");
                    Some(policy.delay_for(attempt))
                }
            };

            let delay = match delay {
                Some(delay) if policy.allows_retry_after(attempt) => delay,
                _ => return outcome,
            };

            debug!(delay_ms = delay.as_millis() as u64, "Retrying after delay");
            tokio::time::sleep(delay).await;
        }
    }
}
