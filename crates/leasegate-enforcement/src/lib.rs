//! leasegate enforcement library entry.
//!
//! Wires the filter registry, the built-in filters, and the enforcement
//! chain consulted by the leasing layer before a lease is created, updated,
//! or ended. Evaluations are independent: the chain holds no mutable state,
//! so one `Arc<EnforcementChain>` can serve concurrent requests. Dropping an
//! evaluation future abandons any in-flight remote call.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod chain;
pub mod config;
pub mod filter;
pub mod filters;
pub mod obs;
pub mod registry;
pub mod request;

pub use chain::EnforcementChain;
pub use filter::EnforcementFilter;
pub use registry::FilterRegistry;
