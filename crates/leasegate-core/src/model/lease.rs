use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{LeaseGateError, Result};

/// A concrete resource instance assigned by the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub id: String,
    pub hypervisor_hostname: String,
    /// Free-form attributes (e.g. `availability_zone`).
    #[serde(default)]
    pub extra: BTreeMap<String, Value>,
}

/// A request within a lease for a quantity of one resource type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    /// Resource kind tag, e.g. `physical:host`.
    pub resource_type: String,
    pub min: u32,
    pub max: u32,
    /// Opaque predicate evaluated by the scheduler.
    #[serde(default)]
    pub hypervisor_properties: String,
    /// Opaque predicate evaluated by the scheduler.
    #[serde(default)]
    pub resource_properties: String,
    #[serde(default)]
    pub allocations: Vec<Allocation>,
}

/// Lease snapshot: a time window plus its ordered reservations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lease {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub reservations: Vec<Reservation>,
}

impl Lease {
    pub fn new(start_date: DateTime<Utc>, end_date: DateTime<Utc>) -> Self {
        Self {
            id: None,
            name: None,
            start_date,
            end_date,
            reservations: Vec::new(),
        }
    }

    pub fn with_reservation(mut self, reservation: Reservation) -> Self {
        self.reservations.push(reservation);
        self
    }

    /// Signed length of the lease window. Non-positive for malformed leases.
    pub fn duration(&self) -> Duration {
        self.end_date - self.start_date
    }

    /// Check snapshot invariants (window order, min/max, allocation ownership).
    pub fn validate(&self) -> Result<()> {
        if self.end_date <= self.start_date {
            return Err(LeaseGateError::InvalidRequest(format!(
                "lease end_date {} must be after start_date {}",
                self.end_date, self.start_date
            )));
        }

        let mut seen = HashSet::new();
        for (idx, r) in self.reservations.iter().enumerate() {
            if r.min > r.max {
                return Err(LeaseGateError::InvalidRequest(format!(
                    "reservation {idx} ({}): min {} exceeds max {}",
                    r.resource_type, r.min, r.max
                )));
            }
            for a in &r.allocations {
                if !seen.insert(a.id.as_str()) {
                    return Err(LeaseGateError::InvalidRequest(format!(
                        "allocation {} appears in more than one reservation",
                        a.id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Total number of allocations across all reservations.
    pub fn allocation_count(&self) -> usize {
        self.reservations.iter().map(|r| r.allocations.len()).sum()
    }
}

impl Reservation {
    pub fn new(resource_type: impl Into<String>, min: u32, max: u32) -> Self {
        Self {
            resource_type: resource_type.into(),
            min,
            max,
            hypervisor_properties: String::new(),
            resource_properties: String::new(),
            allocations: Vec::new(),
        }
    }

    pub fn with_allocation(mut self, allocation: Allocation) -> Self {
        self.allocations.push(allocation);
        self
    }
}

impl Allocation {
    pub fn new(id: impl Into<String>, hypervisor_hostname: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            hypervisor_hostname: hypervisor_hostname.into(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}
