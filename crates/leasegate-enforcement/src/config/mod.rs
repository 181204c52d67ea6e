//! Enforcement config loader (strict parsing).

pub mod schema;

use std::fs;
use std::path::Path;

use leasegate_core::error::{LeaseGateError, Result};

pub use schema::{
    AuthHeader, EnforcementSection, ExternalServiceConfig, FiltersSection, LeaseGateConfig,
    MaxReservationLengthConfig,
};

pub fn load_from_file(path: impl AsRef<Path>) -> Result<LeaseGateConfig> {
    let path = path.as_ref();
    let s = fs::read_to_string(path).map_err(|e| {
        LeaseGateError::Configuration(format!("read config {} failed: {e}", path.display()))
    })?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<LeaseGateConfig> {
    let cfg: LeaseGateConfig = serde_yaml::from_str(s)
        .map_err(|e| LeaseGateError::Configuration(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
