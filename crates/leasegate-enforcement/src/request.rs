//! Owned hook request, as read by `leasegate-check`.

use serde::Deserialize;

use leasegate_core::error::{LeaseGateError, Result};
use leasegate_core::{EnforcementContext, Hook, Lease, LeaseChange};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HookRequest {
    pub hook: Hook,
    pub context: EnforcementContext,
    #[serde(default)]
    pub lease: Option<Lease>,
    #[serde(default)]
    pub current_lease: Option<Lease>,
}

impl HookRequest {
    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s)
            .map_err(|e| LeaseGateError::InvalidRequest(format!("invalid hook request: {e}")))
    }

    /// Borrow the snapshots required by `hook`.
    pub fn change(&self) -> Result<LeaseChange<'_>> {
        let missing = |field: &str| {
            LeaseGateError::InvalidRequest(format!(
                "{} request requires {field}",
                self.hook.as_str()
            ))
        };
        match self.hook {
            Hook::Create => Ok(LeaseChange::Create {
                lease: self.lease.as_ref().ok_or_else(|| missing("lease"))?,
            }),
            Hook::Update => Ok(LeaseChange::Update {
                current_lease: self
                    .current_lease
                    .as_ref()
                    .ok_or_else(|| missing("current_lease"))?,
                lease: self.lease.as_ref().ok_or_else(|| missing("lease"))?,
            }),
            Hook::End => Ok(LeaseChange::End {
                current_lease: self
                    .current_lease
                    .as_ref()
                    .ok_or_else(|| missing("current_lease"))?,
            }),
        }
    }
}
