//! Local threshold filter bounding lease length.
//!
//! Create and update compare the proposed lease window against the
//! configured maximum. With an extension window configured, an update that
//! pushes the end date out may exceed the maximum as long as it is requested
//! close enough to the current end date; only the added time is then
//! measured.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use leasegate_core::{Decision, EnforcementContext, Lease};

use crate::config::MaxReservationLengthConfig;
use crate::filter::EnforcementFilter;

pub struct MaxReservationLengthFilter {
    max_length: Duration,
    extension_window: Option<Duration>,
    exempt_projects: HashSet<String>,
    clock: fn() -> DateTime<Utc>,
}

impl MaxReservationLengthFilter {
    pub const NAME: &'static str = "MaxReservationLengthFilter";

    pub fn new(max_length_secs: u64) -> Self {
        Self {
            max_length: secs(max_length_secs),
            extension_window: None,
            exempt_projects: HashSet::new(),
            clock: Utc::now,
        }
    }

    pub fn from_config(cfg: &MaxReservationLengthConfig) -> Self {
        let mut filter = Self::new(cfg.max_reservation_length)
            .with_exempt_projects(cfg.exempt_project_ids.iter().cloned());
        if let Some(window) = cfg.reservation_extension_window {
            filter = filter.with_extension_window(window);
        }
        filter
    }

    pub fn with_extension_window(mut self, window_secs: u64) -> Self {
        self.extension_window = Some(secs(window_secs));
        self
    }

    pub fn with_exempt_projects(mut self, projects: impl IntoIterator<Item = String>) -> Self {
        self.exempt_projects.extend(projects);
        self
    }

    /// Override the wall clock used for extension-window checks.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    fn exempt(&self, ctx: &EnforcementContext) -> bool {
        let exempt = self.exempt_projects.contains(&ctx.project_id);
        if exempt {
            tracing::debug!(filter = Self::NAME, project_id = %ctx.project_id, "project exempt from length limit");
        }
        exempt
    }

    /// Checked ahead of exemption; a malformed window is never allowed.
    fn malformed(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Decision> {
        (end <= start).then(|| {
            Decision::error(
                Self::NAME,
                format!("malformed lease window: end {end} is not after start {start}"),
            )
        })
    }

    fn check_length(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Decision {
        if let Some(bad) = Self::malformed(start, end) {
            return bad;
        }
        let length = end - start;
        if length > self.max_length {
            return Decision::deny(
                Self::NAME,
                format!(
                    "lease length of {} seconds ({}) exceeds the maximum lease length of {} seconds ({})",
                    length.num_seconds(),
                    human(length),
                    self.max_length.num_seconds(),
                    human(self.max_length),
                ),
            );
        }
        Decision::Allow
    }

    fn check_extension(&self, current: &Lease, lease: &Lease, window: Duration) -> Decision {
        let opens_at = current
            .end_date
            .checked_sub_signed(window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let now = (self.clock)();
        if now < opens_at {
            return Decision::deny(
                Self::NAME,
                format!(
                    "lease can only be extended within {} seconds ({}) of its current end date {}",
                    window.num_seconds(),
                    human(window),
                    current.end_date
                ),
            );
        }
        self.check_length(current.end_date.max(lease.start_date), lease.end_date)
    }
}

#[async_trait]
impl EnforcementFilter for MaxReservationLengthFilter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn check_create(&self, ctx: &EnforcementContext, lease: &Lease) -> Decision {
        if let Some(bad) = Self::malformed(lease.start_date, lease.end_date) {
            return bad;
        }
        if self.exempt(ctx) {
            return Decision::Allow;
        }
        self.check_length(lease.start_date, lease.end_date)
    }

    async fn check_update(
        &self,
        ctx: &EnforcementContext,
        current_lease: &Lease,
        lease: &Lease,
    ) -> Decision {
        if let Some(bad) = Self::malformed(lease.start_date, lease.end_date) {
            return bad;
        }
        if self.exempt(ctx) {
            return Decision::Allow;
        }
        let proposed = self.check_length(lease.start_date, lease.end_date);
        let extends = lease.end_date > current_lease.end_date;
        match self.extension_window {
            Some(window) if extends && matches!(proposed, Decision::Deny { .. }) => {
                self.check_extension(current_lease, lease, window)
            }
            _ => proposed,
        }
    }
}

// 100 years; keeps every window representable.
const MAX_SECS: i64 = 100 * 365 * 86_400;

fn secs(s: u64) -> Duration {
    Duration::seconds(i64::try_from(s).unwrap_or(MAX_SECS).min(MAX_SECS))
}

/// Compact human rendering, e.g. `1 day`, `2 days 3 hours`, `90 seconds`.
fn human(d: Duration) -> String {
    let total = d.num_seconds();
    let units = [(86_400, "day"), (3_600, "hour"), (60, "minute"), (1, "second")];

    let mut rest = total.max(0);
    let mut parts = Vec::new();
    for (size, unit) in units {
        let n = rest / size;
        if n > 0 {
            parts.push(format!("{n} {unit}{}", if n == 1 { "" } else { "s" }));
            rest %= size;
        }
    }
    if parts.is_empty() {
        return "0 seconds".into();
    }
    parts.join(" ")
}
