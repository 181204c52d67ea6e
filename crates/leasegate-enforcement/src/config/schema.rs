use std::collections::HashSet;

use reqwest::Url;
use secrecy::SecretString;
use serde::Deserialize;

use leasegate_core::error::{LeaseGateError, Result};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LeaseGateConfig {
    pub version: u32,

    #[serde(default)]
    pub enforcement: EnforcementSection,

    #[serde(default)]
    pub filters: FiltersSection,
}

impl LeaseGateConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(LeaseGateError::Configuration(format!(
                "unsupported config version {} (expected 1)",
                self.version
            )));
        }

        self.enforcement.validate()?;
        self.filters.validate()?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnforcementSection {
    /// Filter names, evaluated in this order.
    #[serde(default)]
    pub enabled_filters: Vec<String>,

    /// Projects that bypass every filter.
    #[serde(default)]
    pub exempt_projects: Vec<String>,

    #[serde(default = "default_hook_timeout_ms")]
    pub hook_timeout_ms: u64,
}

impl Default for EnforcementSection {
    fn default() -> Self {
        Self {
            enabled_filters: Vec::new(),
            exempt_projects: Vec::new(),
            hook_timeout_ms: default_hook_timeout_ms(),
        }
    }
}

impl EnforcementSection {
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for name in &self.enabled_filters {
            if !seen.insert(name.as_str()) {
                return Err(LeaseGateError::Configuration(format!(
                    "enforcement.enabled_filters lists {name} more than once"
                )));
            }
        }
        if !(100..=600_000).contains(&self.hook_timeout_ms) {
            return Err(LeaseGateError::Configuration(
                "enforcement.hook_timeout_ms must be between 100 and 600000".into(),
            ));
        }
        Ok(())
    }
}

fn default_hook_timeout_ms() -> u64 {
    30_000
}

/// Per-filter parameters. A section is required only when its filter is enabled.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FiltersSection {
    #[serde(default)]
    pub max_reservation_length: Option<MaxReservationLengthConfig>,

    #[serde(default)]
    pub external_service: Option<ExternalServiceConfig>,
}

impl FiltersSection {
    pub fn validate(&self) -> Result<()> {
        if let Some(c) = &self.max_reservation_length {
            c.validate()?;
        }
        if let Some(c) = &self.external_service {
            c.validate()?;
        }
        Ok(())
    }
}

// 100 years.
const MAX_LENGTH_SECS: u64 = 100 * 365 * 86_400;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaxReservationLengthConfig {
    /// Maximum lease length in seconds.
    pub max_reservation_length: u64,

    /// Seconds before the current end date during which a lease may be
    /// extended by another full length.
    #[serde(default)]
    pub reservation_extension_window: Option<u64>,

    #[serde(default)]
    pub exempt_project_ids: Vec<String>,
}

impl MaxReservationLengthConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_reservation_length == 0 {
            return Err(LeaseGateError::Configuration(
                "filters.max_reservation_length.max_reservation_length must be positive".into(),
            ));
        }
        if self.max_reservation_length > MAX_LENGTH_SECS {
            return Err(LeaseGateError::Configuration(format!(
                "filters.max_reservation_length.max_reservation_length must not exceed {MAX_LENGTH_SECS}"
            )));
        }
        match self.reservation_extension_window {
            Some(0) => Err(LeaseGateError::Configuration(
                "filters.max_reservation_length.reservation_extension_window must be positive".into(),
            )),
            Some(w) if w > MAX_LENGTH_SECS => Err(LeaseGateError::Configuration(format!(
                "filters.max_reservation_length.reservation_extension_window must not exceed {MAX_LENGTH_SECS}"
            ))),
            _ => Ok(()),
        }
    }
}

/// Header carrying the service token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthHeader {
    /// `Authorization: Bearer <token>`
    #[default]
    Bearer,
    /// `X-Auth-Token: <token>`
    XAuthToken,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalServiceConfig {
    /// Base URL; hook paths (`/v1/check-create`, ...) are appended.
    #[serde(default)]
    pub endpoint: Option<String>,

    // Absolute per-hook overrides.
    #[serde(default)]
    pub check_create_url: Option<String>,
    #[serde(default)]
    pub check_update_url: Option<String>,
    #[serde(default)]
    pub on_end_url: Option<String>,

    #[serde(default)]
    pub token: Option<SecretString>,
    /// Environment variable read on every call.
    #[serde(default)]
    pub token_env: Option<String>,

    #[serde(default)]
    pub auth_header: AuthHeader,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Extra attempts after a transport failure.
    #[serde(default)]
    pub max_retries: u32,

    #[serde(default = "default_backoff_initial_ms")]
    pub backoff_initial_ms: u64,

    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
}

impl ExternalServiceConfig {
    pub fn validate(&self) -> Result<()> {
        let urls = [
            ("endpoint", &self.endpoint),
            ("check_create_url", &self.check_create_url),
            ("check_update_url", &self.check_update_url),
            ("on_end_url", &self.on_end_url),
        ];
        if urls.iter().all(|(_, u)| u.is_none()) {
            return Err(LeaseGateError::Configuration(
                "filters.external_service needs an endpoint or at least one hook url".into(),
            ));
        }
        for (name, url) in urls {
            if let Some(u) = url {
                validate_url(name, u)?;
            }
        }

        match (&self.token, &self.token_env) {
            (Some(_), Some(_)) => {
                return Err(LeaseGateError::Configuration(
                    "filters.external_service: set only one of token and token_env".into(),
                ));
            }
            (None, None) => {
                return Err(LeaseGateError::Configuration(
                    "filters.external_service requires token or token_env".into(),
                ));
            }
            _ => {}
        }

        if !(1..=300_000).contains(&self.timeout_ms) {
            return Err(LeaseGateError::Configuration(
                "filters.external_service.timeout_ms must be between 1 and 300000".into(),
            ));
        }
        if self.connect_timeout_ms == 0 || self.connect_timeout_ms > self.timeout_ms {
            return Err(LeaseGateError::Configuration(
                "filters.external_service.connect_timeout_ms must be positive and not exceed timeout_ms"
                    .into(),
            ));
        }
        if self.max_retries > 10 {
            return Err(LeaseGateError::Configuration(
                "filters.external_service.max_retries must be at most 10".into(),
            ));
        }
        if self.backoff_initial_ms > self.backoff_max_ms {
            return Err(LeaseGateError::Configuration(
                "filters.external_service.backoff_initial_ms must not exceed backoff_max_ms".into(),
            ));
        }
        Ok(())
    }
}

fn validate_url(field: &str, raw: &str) -> Result<()> {
    let url = Url::parse(raw).map_err(|e| {
        LeaseGateError::Configuration(format!("filters.external_service.{field}: {e}"))
    })?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(LeaseGateError::Configuration(format!(
            "filters.external_service.{field}: unsupported scheme {other}"
        ))),
    }
}

fn default_timeout_ms() -> u64 {
    5_000
}
fn default_connect_timeout_ms() -> u64 {
    2_000
}
fn default_backoff_initial_ms() -> u64 {
    100
}
fn default_backoff_max_ms() -> u64 {
    2_000
}
