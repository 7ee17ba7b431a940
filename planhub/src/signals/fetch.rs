//! Conditional fetch client for upstream agent signals
//!
//! Issues a single conditional GET per agent with ETag revalidation, bounded
//! retries, and typed error classification. The HTTP transport sits behind a
//! trait so tests can script upstream behavior.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::domain::AgentKind;

use super::parse::{parse_payload, ParseOutcome};
use super::retry::{exponential_backoff, with_retry, RetryDecision, RetryPolicy};

/// Fallback when a 429 carries no Retry-After header
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Terminal fetch failures, one per upstream error class
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Upstream agent timed out")]
    Timeout,

    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("Agent payload failed schema parse: {0}")]
    BadSchema(String),

    #[error("Agent error (status {status:?}): {message}")]
    Agent { status: Option<u16>, message: String },
}

impl FetchError {
    /// Stable error code used in logs and metrics
    pub fn code(&self) -> &'static str {
        match self {
            Self::Timeout => "TIMEOUT",
            Self::RateLimited { .. } => "RATE_LIMIT",
            Self::BadSchema(_) => "BAD_SCHEMA",
            Self::Agent { .. } => "AGENT_ERROR",
        }
    }
}

/// Successful fetch outcomes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// 200 with a (possibly extracted) JSON payload and optional new ETag
    Fresh { payload: Value, etag: Option<String> },
    /// 304: the caller's cached value is still valid; its etag is preserved
    NotModified,
}

/// Query parameters for one signal fetch
#[derive(Debug, Clone)]
pub struct SignalQuery {
    pub subject_id: String,
    pub topic: String,
    pub week: Option<u32>,
    pub day: Option<u32>,
}

impl SignalQuery {
    pub fn new(subject_id: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            topic: topic.into(),
            week: None,
            day: None,
        }
    }

    pub fn with_window(mut self, week: Option<u32>, day: Option<u32>) -> Self {
        self.week = week;
        self.day = day;
        self
    }
}

/// Raw upstream response, one per attempt
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub etag: Option<String>,
    pub retry_after_secs: Option<u64>,
    pub body: String,
}

/// Transport-level failures (before any HTTP status exists)
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Other(String),
}

/// Seam between the fetch client and the network
#[async_trait]
pub trait SignalTransport: Send + Sync {
    async fn get(
        &self,
        kind: AgentKind,
        query: &SignalQuery,
        etag: Option<&str>,
    ) -> Result<RawResponse, TransportError>;
}

/// reqwest-backed transport for the agent signal API
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl HttpTransport {
    pub fn new(
        base_url: impl Into<String>,
        bearer_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Agent {
                status: None,
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token,
        })
    }
}

#[async_trait]
impl SignalTransport for HttpTransport {
    async fn get(
        &self,
        kind: AgentKind,
        query: &SignalQuery,
        etag: Option<&str>,
    ) -> Result<RawResponse, TransportError> {
        let url = format!("{}/agents/{}/signals", self.base_url, kind.key());

        let mut request = self
            .http
            .get(&url)
            .query(&[("subject_id", query.subject_id.as_str()), ("topic", query.topic.as_str())]);

        if let Some(week) = query.week {
            request = request.query(&[("week", week)]);
        }
        if let Some(day) = query.day {
            request = request.query(&[("day", day)]);
        }
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }
        if let Some(etag) = etag {
            request = request.header("If-None-Match", etag);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Other(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let etag = response
            .headers()
            .get("etag")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let retry_after_secs = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());

        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Other(e.to_string()))?;

        Ok(RawResponse {
            status,
            etag,
            retry_after_secs,
            body,
        })
    }
}

/// Conditional fetch client with retry and backoff
pub struct FetchClient {
    transport: Arc<dyn SignalTransport>,
    policy: RetryPolicy,
}

impl FetchClient {
    pub fn new(transport: Arc<dyn SignalTransport>, max_retries: u32) -> Self {
        Self {
            transport,
            policy: RetryPolicy {
                max_attempts: max_retries,
            },
        }
    }

    /// Fetch one agent's signal, revalidating against `etag` when present.
    ///
    /// Retry policy per error class: 429 sleeps the server's Retry-After
    /// (default 60 s), 5xx and attempt timeouts back off `2^attempt` seconds,
    /// everything else is fatal on first sight. The returned error carries
    /// the classification of the final attempt.
    pub async fn fetch(
        &self,
        kind: AgentKind,
        query: &SignalQuery,
        etag: Option<&str>,
    ) -> Result<FetchOutcome, FetchError> {
        let outcome = with_retry(
            self.policy,
            |attempt| {
                debug!(agent = %kind, attempt, conditional = etag.is_some(), "fetching signal");
                self.attempt(kind, query, etag)
            },
            |error, attempt| match error {
                FetchError::RateLimited { retry_after } => RetryDecision::RetryAfter(*retry_after),
                FetchError::Agent { status: Some(s), .. } if (500..600).contains(s) => {
                    RetryDecision::RetryAfter(exponential_backoff(attempt))
                }
                FetchError::Timeout => RetryDecision::RetryAfter(exponential_backoff(attempt)),
                _ => RetryDecision::Fatal,
            },
        )
        .await?;

        Ok(outcome)
    }

    async fn attempt(
        &self,
        kind: AgentKind,
        query: &SignalQuery,
        etag: Option<&str>,
    ) -> Result<FetchOutcome, FetchError> {
        let response = self.transport.get(kind, query, etag).await.map_err(|e| match e {
            TransportError::Timeout => FetchError::Timeout,
            TransportError::Other(message) => FetchError::Agent { status: None, message },
        })?;

        match response.status {
            304 => Ok(FetchOutcome::NotModified),
            200 => match parse_payload(&response.body) {
                ParseOutcome::Parsed(payload) => Ok(FetchOutcome::Fresh {
                    payload,
                    etag: response.etag,
                }),
                ParseOutcome::RawText(text) => Ok(FetchOutcome::Fresh {
                    payload: Value::String(text),
                    etag: response.etag,
                }),
                ParseOutcome::Malformed(reason) => Err(FetchError::BadSchema(reason)),
            },
            429 => Err(FetchError::RateLimited {
                retry_after: Duration::from_secs(response.retry_after_secs.unwrap_or(DEFAULT_RETRY_AFTER_SECS)),
            }),
            status if (500..600).contains(&status) => Err(FetchError::Agent {
                status: Some(status),
                message: "upstream server error".to_string(),
            }),
            status => Err(FetchError::Agent {
                status: Some(status),
                message: "unexpected upstream status".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Transport that replays a scripted sequence of responses
    struct ScriptedTransport {
        script: Mutex<Vec<Result<RawResponse, TransportError>>>,
        calls: Mutex<u32>,
        seen_etags: Mutex<Vec<Option<String>>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<RawResponse, TransportError>>) -> Self {
            Self {
                script: Mutex::new(script),
                calls: Mutex::new(0),
                seen_etags: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl SignalTransport for ScriptedTransport {
        async fn get(
            &self,
            _kind: AgentKind,
            _query: &SignalQuery,
            etag: Option<&str>,
        ) -> Result<RawResponse, TransportError> {
            *self.calls.lock().unwrap() += 1;
            self.seen_etags.lock().unwrap().push(etag.map(|s| s.to_string()));
            self.script.lock().unwrap().remove(0)
        }
    }

    fn ok(status: u16, body: &str, etag: Option<&str>) -> Result<RawResponse, TransportError> {
        Ok(RawResponse {
            status,
            etag: etag.map(|s| s.to_string()),
            retry_after_secs: None,
            body: body.to_string(),
        })
    }

    fn query() -> SignalQuery {
        SignalQuery::new("user-1", "algorithms")
    }

    #[tokio::test(start_paused = true)]
    async fn test_200_returns_payload_and_etag() {
        let transport = Arc::new(ScriptedTransport::new(vec![ok(200, r#"{"x":1}"#, Some("W/\"v1\""))]));
        let client = FetchClient::new(transport.clone(), 3);

        let outcome = client.fetch(AgentKind::Clo, &query(), None).await.unwrap();
        assert_eq!(
            outcome,
            FetchOutcome::Fresh {
                payload: serde_json::json!({"x": 1}),
                etag: Some("W/\"v1\"".to_string()),
            }
        );
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_304_is_not_modified_and_sends_etag() {
        let transport = Arc::new(ScriptedTransport::new(vec![ok(304, "", None)]));
        let client = FetchClient::new(transport.clone(), 3);

        let outcome = client.fetch(AgentKind::Clo, &query(), Some("W/\"v1\"")).await.unwrap();
        assert_eq!(outcome, FetchOutcome::NotModified);
        assert_eq!(
            transport.seen_etags.lock().unwrap().as_slice(),
            &[Some("W/\"v1\"".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_500_makes_exactly_max_retries_attempts() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            ok(500, "", None),
            ok(500, "", None),
            ok(500, "", None),
        ]));
        let client = FetchClient::new(transport.clone(), 3);

        let err = client.fetch(AgentKind::Ta, &query(), None).await.unwrap_err();
        assert_eq!(err.code(), "AGENT_ERROR");
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_429_then_200_sleeps_retry_after() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(RawResponse {
                status: 429,
                etag: None,
                retry_after_secs: Some(1),
                body: String::new(),
            }),
            ok(200, r#"{"ok":true}"#, None),
        ]));
        let client = FetchClient::new(transport.clone(), 3);

        let start = tokio::time::Instant::now();
        let outcome = client.fetch(AgentKind::Pace, &query(), None).await.unwrap();

        assert!(matches!(outcome, FetchOutcome::Fresh { .. }));
        assert_eq!(transport.calls(), 2);
        assert!(start.elapsed() >= Duration::from_secs(1));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_429_exhausted_returns_rate_limit_with_delay() {
        let rate_limited = || {
            Ok(RawResponse {
                status: 429,
                etag: None,
                retry_after_secs: Some(5),
                body: String::new(),
            })
        };
        let transport = Arc::new(ScriptedTransport::new(vec![rate_limited(), rate_limited(), rate_limited()]));
        let client = FetchClient::new(transport.clone(), 3);

        let err = client.fetch(AgentKind::Pace, &query(), None).await.unwrap_err();
        match err {
            FetchError::RateLimited { retry_after } => assert_eq!(retry_after, Duration::from_secs(5)),
            other => panic!("expected RateLimited, got {:?}", other),
        }
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_404_is_immediate_agent_error() {
        let transport = Arc::new(ScriptedTransport::new(vec![ok(404, "", None)]));
        let client = FetchClient::new(transport.clone(), 3);

        let err = client.fetch(AgentKind::Review, &query(), None).await.unwrap_err();
        assert_eq!(err.code(), "AGENT_ERROR");
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bad_schema_is_not_retried() {
        let transport = Arc::new(ScriptedTransport::new(vec![ok(200, r#"{"broken": "#, None)]));
        let client = FetchClient::new(transport.clone(), 3);

        let err = client.fetch(AgentKind::Clo, &query(), None).await.unwrap_err();
        assert_eq!(err.code(), "BAD_SCHEMA");
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_retries_then_reports_timeout() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Err(TransportError::Timeout),
            Err(TransportError::Timeout),
            Err(TransportError::Timeout),
        ]));
        let client = FetchClient::new(transport.clone(), 3);

        let err = client.fetch(AgentKind::Clo, &query(), None).await.unwrap_err();
        assert_eq!(err.code(), "TIMEOUT");
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_prose_body_wraps_as_string_payload() {
        let transport = Arc::new(ScriptedTransport::new(vec![ok(200, "Focus on spaced repetition.", None)]));
        let client = FetchClient::new(transport, 3);

        let outcome = client.fetch(AgentKind::Ta, &query(), None).await.unwrap();
        assert_eq!(
            outcome,
            FetchOutcome::Fresh {
                payload: Value::String("Focus on spaced repetition.".to_string()),
                etag: None,
            }
        );
    }
}
