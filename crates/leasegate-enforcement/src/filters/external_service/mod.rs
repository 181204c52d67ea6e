//! Delegate filter: defers decisions to a remote HTTP policy service.
//!
//! Each hook POSTs the context and lease snapshots as JSON:
//!
//! | hook   | path               | body                              |
//! |--------|--------------------|-----------------------------------|
//! | create | `/v1/check-create` | `{context, lease}`                |
//! | update | `/v1/check-update` | `{context, current_lease, lease}` |
//! | end    | `/v1/on-end`       | `{context, current_lease}`        |
//!
//! The filter never turns an error into allow or deny; that is the chain's
//! call.

mod client;
mod token;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use leasegate_core::error::{LeaseGateError, Result};
use leasegate_core::{Decision, EnforcementContext, Hook, Lease};

use crate::config::ExternalServiceConfig;
use crate::filter::EnforcementFilter;
use crate::obs::EnforcementMetrics;

pub use client::RetryPolicy;
pub use token::{EnvToken, StaticToken, TokenSource};

use client::PolicyClient;

pub const CHECK_CREATE_PATH: &str = "/v1/check-create";
pub const CHECK_UPDATE_PATH: &str = "/v1/check-update";
pub const ON_END_PATH: &str = "/v1/on-end";

#[derive(Serialize)]
struct CreateBody<'a> {
    context: &'a EnforcementContext,
    lease: &'a Lease,
}

#[derive(Serialize)]
struct UpdateBody<'a> {
    context: &'a EnforcementContext,
    current_lease: &'a Lease,
    lease: &'a Lease,
}

#[derive(Serialize)]
struct EndBody<'a> {
    context: &'a EnforcementContext,
    current_lease: &'a Lease,
}

/// Resolved URL per hook; `None` means the hook is not delegated.
#[derive(Debug, Clone, Default)]
struct HookTargets {
    create: Option<Url>,
    update: Option<Url>,
    end: Option<Url>,
}

impl HookTargets {
    fn resolve(cfg: &ExternalServiceConfig) -> Result<Self> {
        let target = |explicit: &Option<String>, path: &str| -> Result<Option<Url>> {
            match (explicit, &cfg.endpoint) {
                (Some(url), _) => parse_url(url).map(Some),
                (None, Some(base)) => parse_url(&join_path(base, path)).map(Some),
                (None, None) => Ok(None),
            }
        };
        Ok(Self {
            create: target(&cfg.check_create_url, CHECK_CREATE_PATH)?,
            update: target(&cfg.check_update_url, CHECK_UPDATE_PATH)?,
            end: target(&cfg.on_end_url, ON_END_PATH)?,
        })
    }

    fn get(&self, hook: Hook) -> Option<&Url> {
        match hook {
            Hook::Create => self.create.as_ref(),
            Hook::Update => self.update.as_ref(),
            Hook::End => self.end.as_ref(),
        }
    }
}

pub struct ExternalServiceFilter {
    targets: HookTargets,
    client: PolicyClient,
}

impl ExternalServiceFilter {
    pub const NAME: &'static str = "ExternalServiceFilter";

    pub fn from_config(cfg: &ExternalServiceConfig) -> Result<Self> {
        let token: Arc<dyn TokenSource> = match (&cfg.token, &cfg.token_env) {
            (Some(t), _) => Arc::new(StaticToken::new(SecretString::from(
                t.expose_secret().to_owned(),
            ))),
            (None, Some(var)) => Arc::new(EnvToken::new(var.clone())),
            (None, None) => {
                return Err(LeaseGateError::Configuration(
                    "filters.external_service requires token or token_env".into(),
                ))
            }
        };

        let retry = RetryPolicy {
            max_retries: cfg.max_retries,
            initial_delay: Duration::from_millis(cfg.backoff_initial_ms),
            max_delay: Duration::from_millis(cfg.backoff_max_ms),
        };
        let client = PolicyClient::new(
            Duration::from_millis(cfg.timeout_ms),
            Duration::from_millis(cfg.connect_timeout_ms),
            cfg.auth_header,
            token,
            retry,
        )?;

        Ok(Self {
            targets: HookTargets::resolve(cfg)?,
            client,
        })
    }

    /// Replace the configured token with a custom supplier.
    pub fn with_token_source(mut self, token: Arc<dyn TokenSource>) -> Self {
        self.client.set_token_source(token);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<EnforcementMetrics>) -> Self {
        self.client.set_metrics(metrics);
        self
    }

    /// URL the given hook is delegated to, if any.
    pub fn target(&self, hook: Hook) -> Option<&Url> {
        self.targets.get(hook)
    }

    async fn delegate<B: Serialize>(&self, hook: Hook, body: &B) -> Decision {
        let Some(url) = self.targets.get(hook) else {
            tracing::debug!(hook = hook.as_str(), "no external policy url for hook, skipping");
            return Decision::Allow;
        };
        let body = match serde_json::to_vec(body) {
            Ok(b) => b,
            Err(e) => {
                return Decision::error(Self::NAME, format!("encode request body failed: {e}"))
            }
        };
        self.client.post(hook, url, body).await
    }
}

#[async_trait]
impl EnforcementFilter for ExternalServiceFilter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn check_create(&self, ctx: &EnforcementContext, lease: &Lease) -> Decision {
        let body = CreateBody {
            context: ctx,
            lease,
        };
        self.delegate(Hook::Create, &body).await
    }

    async fn check_update(
        &self,
        ctx: &EnforcementContext,
        current_lease: &Lease,
        lease: &Lease,
    ) -> Decision {
        let body = UpdateBody {
            context: ctx,
            current_lease,
            lease,
        };
        self.delegate(Hook::Update, &body).await
    }

    async fn on_end(&self, ctx: &EnforcementContext, current_lease: &Lease) -> Decision {
        let body = EndBody {
            context: ctx,
            current_lease,
        };
        self.delegate(Hook::End, &body).await
    }
}

fn join_path(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| {
        LeaseGateError::Configuration(format!("invalid external service url {raw}: {e}"))
    })
}
