use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use leasegate_core::error::{LeaseGateError, Result};

/// Supplies the token presented to the remote policy service.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<SecretString>;
}

/// Fixed token taken from configuration.
pub struct StaticToken(SecretString);

impl StaticToken {
    pub fn new(token: SecretString) -> Self {
        Self(token)
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> Result<SecretString> {
        Ok(SecretString::from(self.0.expose_secret().to_owned()))
    }
}

/// Token read from an environment variable on every call.
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

#[async_trait]
impl TokenSource for EnvToken {
    async fn token(&self) -> Result<SecretString> {
        match std::env::var(&self.var) {
            Ok(v) if !v.trim().is_empty() => Ok(SecretString::from(v)),
            _ => Err(LeaseGateError::Internal(format!(
                "token variable {} is unset or empty",
                self.var
            ))),
        }
    }
}
