//! Domain → operator registry
//!
//! The registry maps DNS zones to the [`RecordOperator`] that manages them.
//! It is filled once at startup from configuration and then shared
//! read-only (behind an `Arc`) by every request.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fcddns_core::OperatorRegistry;
//!
//! let mut registry = OperatorRegistry::new();
//!
//! // Provider crates assign their operator to the configured domains
//! fcddns_provider_cloudflare::register(&mut registry, &cloudflare_config)?;
//!
//! let registry = std::sync::Arc::new(registry);
//! let operator = registry.get("example.com");
//! ```
//!
//! ## Wildcard
//!
//! The key `"*"` is reserved: it answers for every domain without an exact
//! entry.

use std::collections::HashMap;
use std::sync::Arc;

use crate::traits::RecordOperator;

/// Reserved key of the fallback operator
pub const WILDCARD: &str = "*";

/// Domain → operator lookup table
#[derive(Default, Clone)]
pub struct OperatorRegistry {
    operators: HashMap<String, Arc<dyn RecordOperator>>,
}

impl std::fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut entries: Vec<_> = self
            .operators
            .iter()
            .map(|(domain, op)| (domain.as_str(), op.provider_name()))
            .collect();
        entries.sort_unstable();

        f.debug_struct("OperatorRegistry")
            .field("operators", &entries)
            .finish()
    }
}

impl OperatorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `operator` to `domain`
    ///
    /// The domain is trimmed; an empty result is ignored. An existing entry
    /// is overwritten.
    pub fn set(&mut self, domain: &str, operator: Arc<dyn RecordOperator>) {
        let domain = domain.trim();
        if domain.is_empty() {
            return;
        }

        if let Some(previous) = self.operators.insert(domain.to_string(), operator) {
            tracing::warn!(
                "Domain {} was assigned to {}, overwriting",
                domain,
                previous.provider_name()
            );
        }
    }

    /// Assign `operator` to every domain in a comma-separated list
    ///
    /// Returns the number of domains assigned.
    pub fn assign(&mut self, domains: &str, operator: Arc<dyn RecordOperator>) -> usize {
        let mut assigned = 0;
        for domain in domains.split(',').filter(|d| !d.trim().is_empty()) {
            self.set(domain, Arc::clone(&operator));
            assigned += 1;
        }
        assigned
    }

    /// Look up the operator for `domain`, falling back to the wildcard
    pub fn get(&self, domain: &str) -> Option<Arc<dyn RecordOperator>> {
        self.operators
            .get(domain)
            .or_else(|| self.operators.get(WILDCARD))
            .cloned()
    }

    /// Configured domains (including `"*"`), sorted
    pub fn domains(&self) -> Vec<String> {
        let mut domains: Vec<String> = self.operators.keys().cloned().collect();
        domains.sort_unstable();
        domains
    }

    /// Whether no domain is configured
    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{InvocationContext, UpdateResult};
    use async_trait::async_trait;

    struct NamedOperator(&'static str);

    #[async_trait]
    impl RecordOperator for NamedOperator {
        async fn update(
            &self,
            _ctx: &InvocationContext,
            _domain: &str,
            _host: &str,
            ip: &str,
        ) -> crate::Result<UpdateResult> {
            Ok(UpdateResult::Unchanged {
                current_ip: ip.to_string(),
            })
        }

        fn provider_name(&self) -> &'static str {
            self.0
        }
    }

    fn op(name: &'static str) -> Arc<dyn RecordOperator> {
        Arc::new(NamedOperator(name))
    }

    #[test]
    fn set_trims_and_ignores_blank() {
        let mut registry = OperatorRegistry::new();
        registry.set("  example.com \n", op("a"));
        registry.set("   ", op("b"));
        registry.set("", op("c"));

        assert_eq!(registry.domains(), vec!["example.com"]);
        assert_eq!(registry.get("example.com").unwrap().provider_name(), "a");
    }

    #[test]
    fn set_overwrites() {
        let mut registry = OperatorRegistry::new();
        registry.set("example.com", op("a"));
        registry.set("example.com", op("b"));

        assert_eq!(registry.get("example.com").unwrap().provider_name(), "b");
    }

    #[test]
    fn unknown_domain_without_wildcard_is_none() {
        let mut registry = OperatorRegistry::new();
        registry.set("example.com", op("a"));

        assert!(registry.get("example.org").is_none());
    }

    #[test]
    fn assign_splits_comma_list() {
        let mut registry = OperatorRegistry::new();
        let assigned = registry.assign("example.com, example.org,,", op("cloudflare"));

        assert_eq!(assigned, 2);
        assert_eq!(registry.domains(), vec!["example.com", "example.org"]);
        assert!(OperatorRegistry::new().is_empty());
    }
}
