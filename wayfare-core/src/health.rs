//! Health check aggregation shared by every Wayfare service.
//!
//! Provides a [`HealthIndicator`] trait for custom checks (database
//! reachability, downstream dependency pings, ...) and a [`HealthState`]
//! that aggregates them into one response, with optional result caching so
//! a liveness probe hit every second doesn't re-run expensive checks.
//! Transport wiring (mounting this behind an HTTP or gRPC handler) lives in
//! `wayfare-grpc`, which owns the sidecar listener.

use std::time::{Duration, Instant};

use serde::Serialize;

/// Result of a single health check.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Up,
    Down(String),
}

impl HealthStatus {
    pub fn is_up(&self) -> bool {
        matches!(self, HealthStatus::Up)
    }
}

/// A named health indicator.
pub trait HealthIndicator: Send + Sync + 'static {
    /// The name of this health check (e.g. `"database"`, `"cache"`).
    fn name(&self) -> &str;

    /// Perform the health check.
    fn check(&self) -> impl std::future::Future<Output = HealthStatus> + Send;

    /// Whether this check affects the readiness probe (default: `true`).
    /// Liveness-only checks return `false` so they don't block readiness.
    fn affects_readiness(&self) -> bool {
        true
    }
}

/// A single check result in the health response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthCheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthCheckStatus {
    Up,
    Down,
}

/// Aggregated health response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: HealthCheckStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub checks: Vec<HealthCheck>,
    pub uptime_seconds: u64,
}

/// Object-safe wrapper for `HealthIndicator`.
#[doc(hidden)]
pub trait HealthIndicatorErased: Send + Sync + 'static {
    fn name(&self) -> &str;
    fn check(&self) -> std::pin::Pin<Box<dyn std::future::Future<Output = HealthStatus> + Send + '_>>;
    fn affects_readiness(&self) -> bool;
}

impl<T: HealthIndicator> HealthIndicatorErased for T {
    fn name(&self) -> &str {
        HealthIndicator::name(self)
    }

    fn check(&self) -> std::pin::Pin<Box<dyn std::future::Future<Output = HealthStatus> + Send + '_>> {
        Box::pin(HealthIndicator::check(self))
    }

    fn affects_readiness(&self) -> bool {
        HealthIndicator::affects_readiness(self)
    }
}

/// Builder for assembling a [`HealthState`] from a set of indicators.
pub struct HealthBuilder {
    checks: Vec<Box<dyn HealthIndicatorErased>>,
    cache_ttl: Option<Duration>,
}

impl HealthBuilder {
    pub fn new() -> Self {
        Self { checks: Vec::new(), cache_ttl: None }
    }

    /// Register a health check.
    pub fn check<H: HealthIndicator>(mut self, indicator: H) -> Self {
        self.checks.push(Box::new(indicator));
        self
    }

    /// Cache aggregated results for this duration before re-running checks.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn build(self) -> HealthState {
        HealthState {
            checks: self.checks,
            start_time: Instant::now(),
            cache_ttl: self.cache_ttl,
            cache: tokio::sync::RwLock::new(None),
        }
    }
}

impl Default for HealthBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregates a set of health indicators behind an optional result cache.
pub struct HealthState {
    checks: Vec<Box<dyn HealthIndicatorErased>>,
    start_time: Instant,
    cache_ttl: Option<Duration>,
    cache: tokio::sync::RwLock<Option<(HealthResponse, Instant)>>,
}

impl HealthState {
    async fn run_checks(&self, readiness_only: bool) -> HealthResponse {
        let mut checks = Vec::new();
        let mut all_up = true;

        for indicator in &self.checks {
            if readiness_only && !indicator.affects_readiness() {
                continue;
            }
            let start = Instant::now();
            let status = indicator.check().await;
            let duration_ms = start.elapsed().as_millis() as u64;

            let (check_status, reason) = match &status {
                HealthStatus::Up => (HealthCheckStatus::Up, None),
                HealthStatus::Down(r) => {
                    all_up = false;
                    (HealthCheckStatus::Down, Some(r.clone()))
                }
            };
            checks.push(HealthCheck {
                name: indicator.name().to_string(),
                status: check_status,
                reason,
                duration_ms: Some(duration_ms),
            });
        }

        HealthResponse {
            status: if all_up { HealthCheckStatus::Up } else { HealthCheckStatus::Down },
            checks,
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Aggregate every registered check.
    pub async fn aggregate(&self) -> HealthResponse {
        if let Some(ttl) = self.cache_ttl {
            let cache = self.cache.read().await;
            if let Some((ref response, ref timestamp)) = *cache {
                if timestamp.elapsed() < ttl {
                    return response.clone();
                }
            }
        }

        let response = self.run_checks(false).await;

        if self.cache_ttl.is_some() {
            let mut cache = self.cache.write().await;
            *cache = Some((response.clone(), Instant::now()));
        }

        response
    }

    /// Aggregate only checks that affect readiness. Does not share the
    /// full-aggregate cache: a liveness-only check excluded here must not
    /// poison the readiness view.
    pub async fn aggregate_readiness(&self) -> HealthResponse {
        self.run_checks(true).await
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysUp;
    impl HealthIndicator for AlwaysUp {
        fn name(&self) -> &str {
            "always_up"
        }
        async fn check(&self) -> HealthStatus {
            HealthStatus::Up
        }
    }

    struct AlwaysDown;
    impl HealthIndicator for AlwaysDown {
        fn name(&self) -> &str {
            "always_down"
        }
        async fn check(&self) -> HealthStatus {
            HealthStatus::Down("connection refused".into())
        }
        fn affects_readiness(&self) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn aggregate_is_up_when_all_checks_pass() {
        let state = HealthBuilder::new().check(AlwaysUp).build();
        let response = state.aggregate().await;
        assert_eq!(response.status, HealthCheckStatus::Up);
        assert_eq!(response.checks.len(), 1);
    }

    #[tokio::test]
    async fn aggregate_is_down_when_any_check_fails() {
        let state = HealthBuilder::new().check(AlwaysUp).check(AlwaysDown).build();
        let response = state.aggregate().await;
        assert_eq!(response.status, HealthCheckStatus::Down);
    }

    #[tokio::test]
    async fn readiness_excludes_liveness_only_checks() {
        let state = HealthBuilder::new().check(AlwaysUp).check(AlwaysDown).build();
        let response = state.aggregate_readiness().await;
        assert_eq!(response.status, HealthCheckStatus::Up);
        assert_eq!(response.checks.len(), 1);
    }

    #[tokio::test]
    async fn cached_result_is_reused_within_ttl() {
        let state = HealthBuilder::new().check(AlwaysUp).cache_ttl(Duration::from_secs(60)).build();
        let first = state.aggregate().await;
        let second = state.aggregate().await;
        assert_eq!(first.uptime_seconds, second.uptime_seconds);
    }
}
