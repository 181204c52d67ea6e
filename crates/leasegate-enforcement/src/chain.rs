//! Enforcement chain: ordered, fail-closed evaluation of enabled filters.
//!
//! Filters run one at a time in configured order. The first `deny` or
//! `error` ends the scan and is returned as-is; an empty chain allows. The
//! whole scan for one hook shares a single deadline, and a filter that
//! panics is reported as `error` instead of unwinding into the caller.
//! The context and lease snapshots are validated before any filter runs.

use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::time::Instant;

use leasegate_core::error::Result;
use leasegate_core::{Decision, EnforcementContext, Lease, LeaseChange};

use crate::config::{LeaseGateConfig, FiltersSection};
use crate::filter::{run_hook, EnforcementFilter};
use crate::obs::EnforcementMetrics;
use crate::registry::{FilterInit, FilterRegistry};

/// Name reported for decisions made by the chain itself.
pub const CHAIN_NAME: &str = "enforcement";

const DEFAULT_HOOK_TIMEOUT: Duration = Duration::from_secs(30);

/// Immutable after construction; share via `Arc` across workers.
pub struct EnforcementChain {
    filters: Vec<Arc<dyn EnforcementFilter>>,
    exempt_projects: HashSet<String>,
    hook_timeout: Duration,
    metrics: Arc<EnforcementMetrics>,
}

impl EnforcementChain {
    pub fn new(filters: Vec<Arc<dyn EnforcementFilter>>) -> Self {
        Self {
            filters,
            exempt_projects: HashSet::new(),
            hook_timeout: DEFAULT_HOOK_TIMEOUT,
            metrics: Arc::new(EnforcementMetrics::default()),
        }
    }

    /// Build the chain from config, resolving each enabled name through
    /// `registry`. Any unresolvable name fails the whole build.
    pub fn from_config(cfg: &LeaseGateConfig, registry: &FilterRegistry) -> Result<Self> {
        let metrics = Arc::new(EnforcementMetrics::default());
        let init = FilterInit {
            filters: &cfg.filters,
            metrics: &metrics,
        };

        let mut filters = Vec::with_capacity(cfg.enforcement.enabled_filters.len());
        for name in &cfg.enforcement.enabled_filters {
            filters.push(registry.build(name, &init)?);
        }

        warn_unused_sections(&cfg.filters, &cfg.enforcement.enabled_filters);

        let chain = Self {
            filters,
            exempt_projects: cfg.enforcement.exempt_projects.iter().cloned().collect(),
            hook_timeout: Duration::from_millis(cfg.enforcement.hook_timeout_ms),
            metrics,
        };
        tracing::info!(
            filters = ?chain.filter_names(),
            exempt_projects = chain.exempt_projects.len(),
            hook_timeout_ms = cfg.enforcement.hook_timeout_ms,
            "enforcement chain built"
        );
        Ok(chain)
    }

    pub fn with_exempt_projects(mut self, projects: impl IntoIterator<Item = String>) -> Self {
        self.exempt_projects.extend(projects);
        self
    }

    pub fn with_hook_timeout(mut self, timeout: Duration) -> Self {
        self.hook_timeout = timeout;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<EnforcementMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn filter_names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    pub fn metrics(&self) -> &Arc<EnforcementMetrics> {
        &self.metrics
    }

    /// Evaluate every filter on the hook implied by `change`.
    pub async fn evaluate(&self, ctx: &EnforcementContext, change: LeaseChange<'_>) -> Decision {
        let hook = change.hook();

        if let Err(e) = ctx.validate().and_then(|()| validate_snapshots(change)) {
            let decision = Decision::error(CHAIN_NAME, e.to_string());
            self.record(hook.as_str(), CHAIN_NAME, &decision, ctx);
            return decision;
        }

        if self.exempt_projects.contains(&ctx.project_id) {
            tracing::debug!(hook = hook.as_str(), project_id = %ctx.project_id, "project exempt from enforcement");
            self.metrics.exempt.inc(&[("hook", hook.as_str())]);
            return Decision::Allow;
        }

        let deadline = Instant::now() + self.hook_timeout;
        for filter in &self.filters {
            let name = filter.name();
            let call = AssertUnwindSafe(run_hook(filter.as_ref(), ctx, change)).catch_unwind();

            let decision = match tokio::time::timeout_at(deadline, call).await {
                Ok(Ok(d)) => d,
                Ok(Err(panic)) => Decision::error(
                    name,
                    format!("filter panicked: {}", panic_message(panic.as_ref())),
                ),
                Err(_) => Decision::error(
                    name,
                    format!(
                        "{} exceeded the {}ms enforcement budget",
                        hook.as_str(),
                        self.hook_timeout.as_millis()
                    ),
                ),
            };

            self.record(hook.as_str(), name, &decision, ctx);
            if !decision.is_allow() {
                return decision;
            }
        }
        Decision::Allow
    }

    pub async fn check_create(&self, ctx: &EnforcementContext, lease: &Lease) -> Result<()> {
        self.evaluate(ctx, LeaseChange::Create { lease })
            .await
            .into_result()
    }

    pub async fn check_update(
        &self,
        ctx: &EnforcementContext,
        current_lease: &Lease,
        lease: &Lease,
    ) -> Result<()> {
        self.evaluate(
            ctx,
            LeaseChange::Update {
                current_lease,
                lease,
            },
        )
        .await
        .into_result()
    }

    pub async fn on_end(&self, ctx: &EnforcementContext, current_lease: &Lease) -> Result<()> {
        self.evaluate(ctx, LeaseChange::End { current_lease })
            .await
            .into_result()
    }

    fn record(&self, hook: &str, filter: &str, decision: &Decision, ctx: &EnforcementContext) {
        self.metrics.decisions.inc(&[
            ("hook", hook),
            ("filter", filter),
            ("outcome", decision.outcome()),
        ]);
        match decision {
            Decision::Allow => {
                tracing::debug!(hook, filter, project_id = %ctx.project_id, outcome = "allowed", "filter allowed");
            }
            Decision::Deny { reason, .. } => {
                tracing::warn!(hook, filter, project_id = %ctx.project_id, outcome = "denied", %reason, "lease operation denied by policy");
            }
            Decision::Error { reason, .. } => {
                tracing::error!(hook, filter, project_id = %ctx.project_id, outcome = "unavailable", %reason, "policy could not be evaluated");
            }
        }
    }
}

fn warn_unused_sections(filters: &FiltersSection, enabled: &[String]) {
    use crate::filters::{ExternalServiceFilter, MaxReservationLengthFilter};

    let sections = [
        (filters.max_reservation_length.is_some(), MaxReservationLengthFilter::NAME),
        (filters.external_service.is_some(), ExternalServiceFilter::NAME),
    ];
    for (configured, name) in sections {
        if configured && !enabled.iter().any(|e| e == name) {
            tracing::warn!(filter = name, "filter configured but not enabled");
        }
    }
}

fn validate_snapshots(change: LeaseChange<'_>) -> Result<()> {
    match change {
        LeaseChange::Create { lease } => lease.validate(),
        LeaseChange::Update { current_lease, lease } => {
            current_lease.validate()?;
            lease.validate()
        }
        LeaseChange::End { current_lease } => current_lease.validate(),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}
