//! Top-level facade crate for leasegate.
//!
//! Re-exports the lease model and the enforcement chain so the leasing layer
//! can depend on a single crate.

pub mod core {
    pub use leasegate_core::*;
}

pub mod enforcement {
    pub use leasegate_enforcement::*;
}
