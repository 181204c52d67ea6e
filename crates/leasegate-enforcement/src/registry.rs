use std::sync::Arc;

use dashmap::DashMap;

use leasegate_core::error::{LeaseGateError, Result};

use crate::config::FiltersSection;
use crate::filter::EnforcementFilter;
use crate::filters::{ExternalServiceFilter, MaxReservationLengthFilter};
use crate::obs::metrics::EnforcementMetrics;

/// Inputs handed to a filter factory.
pub struct FilterInit<'a> {
    pub filters: &'a FiltersSection,
    pub metrics: &'a Arc<EnforcementMetrics>,
}

/// Builds one filter instance from its configuration section.
pub type FilterFactory =
    Arc<dyn Fn(&FilterInit<'_>) -> Result<Arc<dyn EnforcementFilter>> + Send + Sync>;

/// Name -> factory mapping used to assemble the enforcement chain.
#[derive(Default)]
pub struct FilterRegistry {
    factories: DashMap<&'static str, FilterFactory>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self {
            factories: DashMap::new(),
        }
    }

    /// Registry with every filter shipped in this crate.
    pub fn with_builtin() -> Self {
        let registry = Self::new();

        registry.register(
            MaxReservationLengthFilter::NAME,
            Arc::new(build_max_reservation_length),
        );
        registry.register(ExternalServiceFilter::NAME, Arc::new(build_external_service));

        registry
    }

    /// Register (or replace) the factory for `name`.
    pub fn register(&self, name: &'static str, factory: FilterFactory) {
        if self.factories.insert(name, factory).is_some() {
            tracing::warn!(filter = name, "filter factory replaced");
        }
    }

    pub fn registered_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.factories.iter().map(|e| *e.key()).collect();
        names.sort_unstable();
        names
    }

    pub fn build(&self, name: &str, init: &FilterInit<'_>) -> Result<Arc<dyn EnforcementFilter>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| {
                LeaseGateError::Configuration(format!(
                    "enabled filter {name} has no implementation (known: {})",
                    self.registered_names().join(", ")
                ))
            })?
            .value()
            .clone();
        factory(init)
    }
}

fn build_max_reservation_length(init: &FilterInit<'_>) -> Result<Arc<dyn EnforcementFilter>> {
    let cfg = init
        .filters
        .max_reservation_length
        .as_ref()
        .ok_or_else(|| missing_section(MaxReservationLengthFilter::NAME, "max_reservation_length"))?;
    Ok(Arc::new(MaxReservationLengthFilter::from_config(cfg)))
}

fn build_external_service(init: &FilterInit<'_>) -> Result<Arc<dyn EnforcementFilter>> {
    let cfg = init
        .filters
        .external_service
        .as_ref()
        .ok_or_else(|| missing_section(ExternalServiceFilter::NAME, "external_service"))?;
    let filter = ExternalServiceFilter::from_config(cfg)?.with_metrics(Arc::clone(init.metrics));
    Ok(Arc::new(filter))
}

fn missing_section(filter: &str, section: &str) -> LeaseGateError {
    LeaseGateError::Configuration(format!(
        "{filter} is enabled but filters.{section} is not configured"
    ))
}
