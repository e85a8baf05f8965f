//! The exclusion list shared by the rate-limit and audit interceptors, per
//! §4.8.3: methods in a configured set bypass both; standard health
//! checks are excluded unconditionally regardless of configuration.

use std::collections::HashSet;

const FORCED_EXCLUSIONS: &[&str] = &["grpc.health.v1.Health/Check", "grpc.health.v1.Health/Watch"];

/// Immutable set of fully-qualified method names exempt from rate limiting
/// and audit logging.
#[derive(Debug, Clone)]
pub struct ExclusionSet {
    methods: HashSet<String>,
}

impl ExclusionSet {
    pub fn new(configured: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mut methods: HashSet<String> = configured.into_iter().map(Into::into).collect();
        methods.extend(FORCED_EXCLUSIONS.iter().map(|s| s.to_string()));
        Self { methods }
    }

    pub fn contains(&self, method: &str) -> bool {
        self.methods.contains(method)
    }
}

impl Default for ExclusionSet {
    fn default() -> Self {
        Self::new(Vec::<String>::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_checks_are_excluded_even_with_empty_configuration() {
        let set = ExclusionSet::default();
        assert!(set.contains("grpc.health.v1.Health/Check"));
    }

    #[test]
    fn configured_methods_are_excluded_alongside_forced_ones() {
        let set = ExclusionSet::new(vec!["wayfare.RoutingService/Solve"]);
        assert!(set.contains("wayfare.RoutingService/Solve"));
        assert!(set.contains("grpc.health.v1.Health/Watch"));
        assert!(!set.contains("wayfare.RoutingService/Other"));
    }
}
