//! Enforcement hooks and the decisions filters return for them.

use serde::{Deserialize, Serialize};

use crate::error::{LeaseGateError, Result};
use crate::model::Lease;

/// Lease lifecycle hook at which the chain is consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hook {
    Create,
    Update,
    End,
}

impl Hook {
    /// Stable label used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Hook::Create => "check_create",
            Hook::Update => "check_update",
            Hook::End => "on_end",
        }
    }
}

/// Lease snapshots supplied for one hook.
///
/// Create carries only the proposed lease, end only the current one, and
/// update carries both.
#[derive(Debug, Clone, Copy)]
pub enum LeaseChange<'a> {
    Create {
        lease: &'a Lease,
    },
    Update {
        current_lease: &'a Lease,
        lease: &'a Lease,
    },
    End {
        current_lease: &'a Lease,
    },
}

impl LeaseChange<'_> {
    pub fn hook(&self) -> Hook {
        match self {
            LeaseChange::Create { .. } => Hook::Create,
            LeaseChange::Update { .. } => Hook::Update,
            LeaseChange::End { .. } => Hook::End,
        }
    }
}

/// Outcome of evaluating a filter (or a whole chain) on one hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Allow,
    /// Legitimate policy rejection.
    Deny { filter: String, reason: String },
    /// The filter could not render a decision.
    Error { filter: String, reason: String },
}

impl Decision {
    pub fn deny(filter: &str, reason: impl Into<String>) -> Self {
        Decision::Deny {
            filter: filter.to_string(),
            reason: reason.into(),
        }
    }

    pub fn error(filter: &str, reason: impl Into<String>) -> Self {
        Decision::Error {
            filter: filter.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Name of the filter that produced a non-allow decision.
    pub fn filter(&self) -> Option<&str> {
        match self {
            Decision::Allow => None,
            Decision::Deny { filter, .. } | Decision::Error { filter, .. } => Some(filter),
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Decision::Allow => None,
            Decision::Deny { reason, .. } | Decision::Error { reason, .. } => Some(reason),
        }
    }

    /// Label distinguishing "policy said no" from "policy unreachable".
    pub fn outcome(&self) -> &'static str {
        match self {
            Decision::Allow => "allowed",
            Decision::Deny { .. } => "denied",
            Decision::Error { .. } => "unavailable",
        }
    }

    /// Convert to a blocking error for the leasing layer.
    pub fn into_result(self) -> Result<()> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny { filter, reason } => {
                Err(LeaseGateError::PolicyDenied { filter, reason })
            }
            Decision::Error { filter, reason } => {
                Err(LeaseGateError::PolicyUnavailable { filter, reason })
            }
        }
    }
}
