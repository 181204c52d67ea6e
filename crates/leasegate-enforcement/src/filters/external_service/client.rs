//! HTTP client for the remote policy service.
//!
//! Maps responses onto decisions: 204 allows, 403 denies (body becomes the
//! reason), anything else is an error. Only connect failures and timeouts
//! are retried, with capped exponential backoff.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode, Url};
use secrecy::ExposeSecret;
use serde::Deserialize;

use leasegate_core::error::{LeaseGateError, Result};
use leasegate_core::{Decision, Hook};

use super::token::TokenSource;
use super::ExternalServiceFilter;
use crate::config::AuthHeader;
use crate::obs::EnforcementMetrics;

/// Retry schedule for transport failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

#[derive(Debug, Deserialize)]
struct DenyBody {
    #[serde(default)]
    message: Option<String>,
}

pub(crate) struct PolicyClient {
    http: Client,
    auth_header: AuthHeader,
    token: Arc<dyn TokenSource>,
    retry: RetryPolicy,
    metrics: Option<Arc<EnforcementMetrics>>,
}

enum SendError {
    /// Connect failure or timeout.
    Transport(reqwest::Error),
    Fatal(String),
}

impl PolicyClient {
    pub(crate) fn new(
        timeout: Duration,
        connect_timeout: Duration,
        auth_header: AuthHeader,
        token: Arc<dyn TokenSource>,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| LeaseGateError::Configuration(format!("http client init failed: {e}")))?;
        Ok(Self {
            http,
            auth_header,
            token,
            retry,
            metrics: None,
        })
    }

    pub(crate) fn set_token_source(&mut self, token: Arc<dyn TokenSource>) {
        self.token = token;
    }

    pub(crate) fn set_metrics(&mut self, metrics: Arc<EnforcementMetrics>) {
        self.metrics = Some(metrics);
    }

    /// POST `body` to `url` and map the response to a decision.
    pub(crate) async fn post(&self, hook: Hook, url: &Url, body: Vec<u8>) -> Decision {
        let name = ExternalServiceFilter::NAME;
        let mut attempt: u32 = 0;
        loop {
            let started = Instant::now();
            let res = self.send_once(url, body.clone()).await;
            if let Some(m) = &self.metrics {
                m.remote_call_duration
                    .observe(&[("hook", hook.as_str())], started.elapsed());
            }

            match res {
                Ok((status, text)) => return self.map_response(hook, status, text),
                Err(SendError::Transport(e)) if attempt < self.retry.max_retries => {
                    attempt += 1;
                    let delay = self.retry.delay_for_attempt(attempt);
                    self.count(hook, "transport_error");
                    tracing::warn!(
                        hook = hook.as_str(),
                        %url,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "external policy call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(SendError::Transport(e)) => {
                    self.count(hook, "transport_error");
                    return Decision::error(
                        name,
                        format!(
                            "external policy service unreachable after {} attempt(s): {}",
                            attempt + 1,
                            describe(&e)
                        ),
                    );
                }
                Err(SendError::Fatal(reason)) => {
                    self.count(hook, "transport_error");
                    return Decision::error(name, reason);
                }
            }
        }
    }

    async fn send_once(
        &self,
        url: &Url,
        body: Vec<u8>,
    ) -> std::result::Result<(StatusCode, String), SendError> {
        let token = self
            .token
            .token()
            .await
            .map_err(|e| SendError::Fatal(format!("token unavailable: {e}")))?;

        let (header, value) = match self.auth_header {
            AuthHeader::Bearer => (AUTHORIZATION, format!("Bearer {}", token.expose_secret())),
            AuthHeader::XAuthToken => (
                HeaderName::from_static("x-auth-token"),
                token.expose_secret().to_owned(),
            ),
        };
        let mut value = HeaderValue::from_str(&value)
            .map_err(|_| SendError::Fatal("token is not a valid header value".into()))?;
        value.set_sensitive(true);

        let resp = self
            .http
            .post(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(header, value)
            .body(body)
            .send()
            .await
            .map_err(classify)?;

        let status = resp.status();
        // The body only matters for denials.
        let text = if status == StatusCode::FORBIDDEN {
            resp.text().await.unwrap_or_default()
        } else {
            String::new()
        };
        Ok((status, text))
    }

    fn map_response(&self, hook: Hook, status: StatusCode, text: String) -> Decision {
        let name = ExternalServiceFilter::NAME;
        match status {
            StatusCode::NO_CONTENT => {
                self.count(hook, "allowed");
                Decision::Allow
            }
            StatusCode::FORBIDDEN => {
                self.count(hook, "denied");
                Decision::deny(name, deny_reason(&text))
            }
            other => {
                self.count(hook, "bad_status");
                Decision::error(
                    name,
                    format!(
                        "external policy service returned HTTP {}; only 204 and 403 are supported",
                        other.as_u16()
                    ),
                )
            }
        }
    }

    fn count(&self, hook: Hook, result: &str) {
        if let Some(m) = &self.metrics {
            m.remote_calls
                .inc(&[("hook", hook.as_str()), ("result", result)]);
        }
    }
}

fn classify(e: reqwest::Error) -> SendError {
    if e.is_timeout() || e.is_connect() {
        SendError::Transport(e)
    } else {
        SendError::Fatal(format!("external policy request failed: {e}"))
    }
}

fn describe(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("timed out ({e})")
    } else {
        format!("connection failed ({e})")
    }
}

fn deny_reason(text: &str) -> String {
    let from_json = serde_json::from_str::<DenyBody>(text)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty());
    match from_json {
        Some(m) => m,
        None if !text.trim().is_empty() => text.trim().to_owned(),
        None => "denied by external policy service".to_owned(),
    }
}
