//! Lease snapshot model handed to enforcement filters.
//!
//! Snapshots are built by the leasing layer per request and are read-only
//! here. Field names double as the JSON wire contract of the remote policy
//! service.

pub mod context;
pub mod lease;

pub use context::EnforcementContext;
pub use lease::{Allocation, Lease, Reservation};
