//! leasegate core: lease snapshot model, enforcement decisions, and the shared
//! error surface.
//!
//! This crate defines the data handed to enforcement filters and the wire
//! shape those snapshots take when delegated to a remote policy service. It
//! carries no runtime or transport dependencies so the leasing layer can
//! build snapshots without pulling in the enforcement stack.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Every fallible
//! path surfaces as `LeaseGateError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod decision;
pub mod error;
pub mod model;

/// Shared result type.
pub use error::{LeaseGateError, Result};

pub use decision::{Decision, Hook, LeaseChange};
pub use model::{Allocation, EnforcementContext, Lease, Reservation};
