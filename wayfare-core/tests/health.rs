use std::time::Duration;

use wayfare_core::health::{HealthBuilder, HealthCheckStatus, HealthIndicator, HealthStatus};

struct AlwaysUp;
impl HealthIndicator for AlwaysUp {
    fn name(&self) -> &str {
        "db"
    }
    async fn check(&self) -> HealthStatus {
        HealthStatus::Up
    }
}

struct AlwaysDown;
impl HealthIndicator for AlwaysDown {
    fn name(&self) -> &str {
        "downstream"
    }
    async fn check(&self) -> HealthStatus {
        HealthStatus::Down("connection refused".into())
    }
}

struct LivenessOnly;
impl HealthIndicator for LivenessOnly {
    fn name(&self) -> &str {
        "disk_space"
    }
    async fn check(&self) -> HealthStatus {
        HealthStatus::Down("disk nearly full".into())
    }
    fn affects_readiness(&self) -> bool {
        false
    }
}

#[test]
fn health_status_is_up_reflects_variant() {
    assert!(HealthStatus::Up.is_up());
    assert!(!HealthStatus::Down("x".into()).is_up());
}

#[tokio::test]
async fn aggregate_reports_down_when_any_check_fails() {
    let state = HealthBuilder::new().check(AlwaysUp).check(AlwaysDown).build();
    let response = state.aggregate().await;
    assert_eq!(response.status, HealthCheckStatus::Down);
    assert_eq!(response.checks.len(), 2);
    let down = response.checks.iter().find(|c| c.name == "downstream").unwrap();
    assert_eq!(down.reason.as_deref(), Some("connection refused"));
}

#[tokio::test]
async fn readiness_excludes_liveness_only_failures() {
    let state = HealthBuilder::new().check(AlwaysUp).check(LivenessOnly).build();
    let full = state.aggregate().await;
    let readiness = state.aggregate_readiness().await;
    assert_eq!(full.status, HealthCheckStatus::Down);
    assert_eq!(readiness.status, HealthCheckStatus::Up);
    assert_eq!(readiness.checks.len(), 1);
}

#[tokio::test]
async fn cached_aggregate_is_reused_within_ttl() {
    let state = HealthBuilder::new().check(AlwaysUp).cache_ttl(Duration::from_secs(3600)).build();
    let first = state.aggregate().await;
    let second = state.aggregate().await;
    assert_eq!(first.checks.len(), second.checks.len());
    assert_eq!(first.uptime_seconds, second.uptime_seconds);
}

#[tokio::test]
async fn empty_builder_reports_up_with_no_checks() {
    let state = HealthBuilder::new().build();
    let response = state.aggregate().await;
    assert_eq!(response.status, HealthCheckStatus::Up);
    assert!(response.checks.is_empty());
}
