use serde::{Deserialize, Serialize};

use crate::error::{LeaseGateError, Result};

/// Acting principal and environment for one enforcement call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforcementContext {
    pub user_id: String,
    pub project_id: String,
    pub auth_url: String,
    pub region_name: String,
}

impl EnforcementContext {
    pub fn new(
        user_id: impl Into<String>,
        project_id: impl Into<String>,
        auth_url: impl Into<String>,
        region_name: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            project_id: project_id.into(),
            auth_url: auth_url.into(),
            region_name: region_name.into(),
        }
    }

    /// Every field must be non-empty before the context reaches a filter.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("user_id", &self.user_id),
            ("project_id", &self.project_id),
            ("auth_url", &self.auth_url),
            ("region_name", &self.region_name),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(LeaseGateError::InvalidRequest(format!(
                    "context.{name} must not be empty"
                )));
            }
        }
        Ok(())
    }
}
