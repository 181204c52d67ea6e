use async_trait::async_trait;

use leasegate_core::{Decision, EnforcementContext, Lease, LeaseChange};

/// Policy unit consulted at lease lifecycle hooks.
///
/// Hooks read the snapshots and return a [`Decision`]; they never mutate
/// lease state. Faults are reported as `Decision::Error`, not panics.
#[async_trait]
pub trait EnforcementFilter: Send + Sync {
    /// Registered name, also used as the `filter` field of decisions.
    fn name(&self) -> &'static str;

    async fn check_create(&self, ctx: &EnforcementContext, lease: &Lease) -> Decision;

    async fn check_update(
        &self,
        ctx: &EnforcementContext,
        current_lease: &Lease,
        lease: &Lease,
    ) -> Decision;

    /// Ending a lease is allowed unless a filter overrides this.
    async fn on_end(&self, _ctx: &EnforcementContext, _current_lease: &Lease) -> Decision {
        Decision::Allow
    }
}

/// Route a lease change to the matching hook of `filter`.
pub async fn run_hook(
    filter: &dyn EnforcementFilter,
    ctx: &EnforcementContext,
    change: LeaseChange<'_>,
) -> Decision {
    match change {
        LeaseChange::Create { lease } => filter.check_create(ctx, lease).await,
        LeaseChange::Update {
            current_lease,
            lease,
        } => filter.check_update(ctx, current_lease, lease).await,
        LeaseChange::End { current_lease } => filter.on_end(ctx, current_lease).await,
    }
}
