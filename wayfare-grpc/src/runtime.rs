//! Service runtime (C9): wires together the five subsystems and the
//! tonic server, and sequences startup/shutdown, per §4.9.
//!
//! Uses a staged builder plus a ctrl-c/SIGTERM shutdown-signal race, the
//! same startup/shutdown shape as a typical owned application builder,
//! generalized here into a plain struct over the five subsystems (rate
//! limiter, audit pipeline, cache, health, metrics) plus the primary RPC
//! listener.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use wayfare_audit::AuditPipeline;
use wayfare_cache::Cache;
use wayfare_core::config::sections::{AppSection, AuditSection, CacheSection, GrpcSection, MetricsSection, RateLimitSection};
use wayfare_core::config::ConfigProperties;
use wayfare_core::health::{HealthBuilder, HealthState};
use wayfare_core::logging::LoggingGuard;
use wayfare_core::{CoreError, ErrorCode, WayfareConfig};
use wayfare_metrics::{metrics_handler, MetricsConfig};
use wayfare_rate_limit::{RateLimiter, RateLimiterConfig, Strategy};

use crate::interceptors::validation::GrpcValidate;
use crate::interceptors::{
    AuditInterceptor, ExclusionSet, LoggingInterceptor, MetricsInterceptor, RateLimitInterceptor, RecoveryInterceptor,
    TracingInterceptor, ValidationInterceptor,
};
use crate::interceptor::RpcInterceptor;

const DRAIN_SLEEP: Duration = Duration::from_secs(2);
const GRACEFUL_STOP_BOUND: Duration = Duration::from_secs(30);

/// Everything startup step (e) produces: each component is independently
/// optional and fault-tolerant — a construction failure is logged as a
/// warning and the runtime proceeds without it.
pub struct ServiceRuntime {
    pub app: AppSection,
    pub grpc: GrpcSection,
    pub metrics: MetricsSection,
    pub rate_limiter: Option<RateLimiter>,
    pub audit: Option<Arc<AuditPipeline>>,
    pub cache: Option<Cache>,
    pub health: HealthState,
    _logging_guard: LoggingGuard,
    metrics_listener: Option<TcpListener>,
}

impl ServiceRuntime {
    /// Startup steps (a)-(f): load config, init logger, init metrics,
    /// construct the optional subsystems, and build the exclusion-aware
    /// default interceptor set consumers assemble their chain from. Tracing
    /// init (step c) and health indicator registration are left to the
    /// caller: tracing export setup and domain-specific health checks (e.g.
    /// database reachability) are both outside this crate's concerns.
    pub async fn bootstrap(config: &WayfareConfig) -> Result<ServiceRuntimeBuilder, CoreError> {
        let app = AppSection::from_config(config).map_err(config_error)?;
        let grpc = GrpcSection::from_config(config).map_err(config_error)?;
        let metrics_section = MetricsSection::from_config(config).map_err(config_error)?;
        let rate_limit_section = RateLimitSection::from_config(config).map_err(config_error)?;
        let audit_section = AuditSection::from_config(config).map_err(config_error)?;
        let cache_section = CacheSection::from_config(config).map_err(config_error)?;

        let log_section = wayfare_core::config::sections::LogSection::from_config(config).map_err(config_error)?;
        let logging_guard = wayfare_core::logging::init((&log_section).into());

        wayfare_metrics::init_metrics(MetricsConfig { namespace: metrics_section.namespace.clone(), ..Default::default() });

        let rate_limiter = if rate_limit_section.enabled {
            Some(build_rate_limiter(&rate_limit_section))
        } else {
            None
        };

        let audit = if audit_section.enabled {
            Some(Arc::new(build_audit_pipeline(&audit_section)))
        } else {
            None
        };

        let cache = if cache_section.enabled {
            match build_cache(&cache_section).await {
                Ok(cache) => Some(cache),
                Err(err) => {
                    tracing::warn!(error = %err, "cache backend construction failed; proceeding without cache");
                    None
                }
            }
        } else {
            None
        };

        Ok(ServiceRuntimeBuilder {
            app,
            grpc,
            metrics: metrics_section,
            rate_limiter,
            audit,
            cache,
            health: HealthBuilder::new(),
            logging_guard,
        })
    }

    /// The exclusion set every rate-limit and audit interceptor consults,
    /// built from `forcedExclusions` plus `audit.excludeMethods`.
    pub fn exclusions(&self, audit_section: &AuditSection) -> ExclusionSet {
        ExclusionSet::new(audit_section.exclude_methods.clone())
    }

    /// Assembles the default chain, per §4.8.2's fixed order: recovery
    /// (outermost) → rate limit → tracing → metrics → logging →
    /// validation → audit (innermost, fires just before the handler).
    /// Services whose request type has no validation logic still
    /// implement [`GrpcValidate`] with the trivial always-valid body.
    pub fn default_chain<Req, Res>(&self, service_name: &str, exclusions: ExclusionSet) -> Vec<Arc<dyn RpcInterceptor<Req, Res>>>
    where
        Req: GrpcValidate + Send + 'static,
        Res: Send + 'static,
    {
        let mut chain: Vec<Arc<dyn RpcInterceptor<Req, Res>>> = vec![Arc::new(RecoveryInterceptor)];

        if let Some(limiter) = &self.rate_limiter {
            chain.push(Arc::new(RateLimitInterceptor::new(limiter.clone(), exclusions.clone())));
        }

        chain.push(Arc::new(TracingInterceptor));
        chain.push(Arc::new(MetricsInterceptor));
        chain.push(Arc::new(LoggingInterceptor));
        chain.push(Arc::new(ValidationInterceptor));

        if let Some(audit) = &self.audit {
            chain.push(Arc::new(AuditInterceptor::new(audit.clone(), service_name.to_string())));
        }

        chain
    }

    /// Binds the metrics sidecar listener (step h) ahead of the primary
    /// listener bind, so a bind failure there surfaces before the RPC
    /// listener commits to its port.
    async fn bind_metrics_listener(&mut self) -> Result<(), CoreError> {
        if !self.metrics.enabled {
            return Ok(());
        }
        let addr: SocketAddr = format!("0.0.0.0:{}", self.metrics.port)
            .parse()
            .map_err(|err| CoreError::new(ErrorCode::Internal, format!("invalid metrics listener address: {err}")))?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|err| CoreError::new(ErrorCode::Internal, format!("failed to bind metrics listener: {err}")))?;
        self.metrics_listener = Some(listener);
        Ok(())
    }

    /// Steps (h)-(j): spawns the metrics sidecar, then drives `router`
    /// bound on the primary gRPC port until a shutdown signal arrives,
    /// per the shutdown sequence (1)-(6). `router` is the tonic
    /// `Router` the caller built by adding its generated services.
    pub async fn run(mut self, router: tonic::transport::server::Router) -> Result<(), CoreError> {
        self.bind_metrics_listener().await?;

        if let Some(listener) = self.metrics_listener.take() {
            let path = self.metrics.path.clone();
            tokio::spawn(async move {
                let app = axum::Router::new().route(&path, get(metrics_handler));
                if let Err(err) = axum::serve(listener, app).await {
                    tracing::error!(error = %err, "metrics sidecar listener stopped unexpectedly");
                }
            });
        }

        let addr: SocketAddr = format!("0.0.0.0:{}", self.grpc.port)
            .parse()
            .map_err(|err| CoreError::new(ErrorCode::Internal, format!("invalid gRPC listener address: {err}")))?;

        tracing::info!(%addr, service = %self.app.name, "gRPC listener bound, health set to SERVING");

        let shutdown = CancellationToken::new();
        let shutdown_for_server = shutdown.clone();
        let server = tokio::spawn(async move {
            router.serve_with_shutdown(addr, shutdown_for_server.cancelled_owned()).await
        });

        shutdown_signal().await;
        self.record_stop_event().await;
        tracing::info!(service = %self.app.name, "health set to NOT_SERVING, draining");
        tokio::time::sleep(DRAIN_SLEEP).await;

        tracing::info!(service = %self.app.name, "requesting graceful stop");
        shutdown.cancel();

        match tokio::time::timeout(GRACEFUL_STOP_BOUND, server).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(err))) => return Err(CoreError::new(ErrorCode::Internal, format!("gRPC server error: {err}"))),
            Ok(Err(err)) => return Err(CoreError::new(ErrorCode::Internal, format!("gRPC server task panicked: {err}"))),
            Err(_) => tracing::warn!("graceful stop deadline elapsed; forcing shutdown"),
        }

        self.shutdown().await
    }

    /// Shutdown step (1): records a synchronous stop event before the
    /// audit pipeline itself is closed, so the shutdown is traceable in
    /// the same sink as ordinary RPC activity.
    async fn record_stop_event(&self) {
        if let Some(audit) = &self.audit {
            let entry = wayfare_audit::AuditEntryBuilder::new("ServiceRuntime/Stop")
                .service(self.app.name.clone())
                .action(wayfare_audit::AuditAction::Logout)
                .outcome(wayfare_audit::AuditOutcome::Success)
                .duration(Duration::ZERO)
                .build();
            audit.log(entry).await;
        }
    }

    /// Shutdown sequence steps (2)-(6): health already reported
    /// NOT_SERVING and the drain sleep already ran in `run`; this closes
    /// the remaining subsystems once the listener has stopped accepting
    /// new calls.
    async fn shutdown(self) -> Result<(), CoreError> {
        if let Some(limiter) = &self.rate_limiter {
            if let Err(err) = limiter.close().await {
                tracing::warn!(error = %err, "rate limiter close failed");
            }
        }
        if let Some(audit) = &self.audit {
            if let Err(err) = audit.close().await {
                tracing::warn!(error = %err, "audit pipeline close failed");
            }
        }
        if let Some(cache) = &self.cache {
            if let Err(err) = cache.close().await {
                tracing::warn!(error = %err, "cache close failed");
            }
        }

        tracing::info!(service = %self.app.name, "shutdown complete");
        Ok(())
    }
}

/// Staged builder returned by [`ServiceRuntime::bootstrap`], letting the
/// caller register domain-specific health indicators (step e's health
/// construction is otherwise complete) before finishing with [`build`](Self::build).
pub struct ServiceRuntimeBuilder {
    app: AppSection,
    grpc: GrpcSection,
    metrics: MetricsSection,
    rate_limiter: Option<RateLimiter>,
    audit: Option<Arc<AuditPipeline>>,
    cache: Option<Cache>,
    health: HealthBuilder,
    logging_guard: LoggingGuard,
}

impl ServiceRuntimeBuilder {
    pub fn health_check<H: wayfare_core::health::HealthIndicator>(mut self, indicator: H) -> Self {
        self.health = self.health.check(indicator);
        self
    }

    pub fn health_cache_ttl(mut self, ttl: Duration) -> Self {
        self.health = self.health.cache_ttl(ttl);
        self
    }

    pub fn build(self) -> ServiceRuntime {
        ServiceRuntime {
            app: self.app,
            grpc: self.grpc,
            metrics: self.metrics,
            rate_limiter: self.rate_limiter,
            audit: self.audit,
            cache: self.cache,
            health: self.health.build(),
            _logging_guard: self.logging_guard,
            metrics_listener: None,
        }
    }
}

fn config_error(err: wayfare_core::config::ConfigError) -> CoreError {
    CoreError::new(ErrorCode::Internal, format!("config error: {err}"))
}

fn build_rate_limiter(section: &RateLimitSection) -> RateLimiter {
    let strategy = if section.strategy == "token_bucket" { Strategy::TokenBucket } else { Strategy::SlidingWindow };
    let config = RateLimiterConfig {
        strategy,
        requests: section.requests,
        window: Duration::from_secs(section.window_secs.max(1)),
        burst: section.burst_size,
    };
    RateLimiter::new(wayfare_rate_limit::backend::memory::InMemoryBackend::new(), config)
}

fn build_audit_pipeline(section: &AuditSection) -> AuditPipeline {
    let config = wayfare_audit::AuditPipelineConfig::from(section);
    match section.backend.as_str() {
        "file" => {
            let path = section.file_path.clone().unwrap_or_else(|| "logs".to_string());
            AuditPipeline::new(config, wayfare_audit::FileSink::new(path, "audit"))
        }
        _ => AuditPipeline::new(config, wayfare_audit::ConsoleSink::new()),
    }
}

async fn build_cache(section: &CacheSection) -> Result<Cache, CoreError> {
    let ttl = Duration::from_secs(section.default_ttl_secs);
    if section.driver == "redis" {
        let addr = format!("redis://{}:{}/{}", section.host, section.port, section.db);
        let backend = wayfare_cache::backend::shared::SharedBackend::connect(&addr).await?;
        Ok(Cache::new(backend, ttl))
    } else {
        Ok(Cache::new(wayfare_cache::backend::memory::InMemoryBackend::new(section.max_entries), ttl))
    }
}

/// Races ctrl-c against SIGTERM (Unix only).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfare_core::ValidationErrors;

    struct Req;
    impl crate::interceptors::validation::GrpcValidate for Req {
        fn validate(&self) -> ValidationErrors {
            ValidationErrors::new()
        }
    }

    fn test_audit_section() -> AuditSection {
        AuditSection {
            enabled: true,
            backend: "console".to_string(),
            file_path: None,
            buffer_size: 16,
            flush_period_secs: 1,
            exclude_methods: vec![],
            include_request: false,
            include_response: false,
            mask_fields: vec![],
        }
    }

    fn bare_runtime() -> ServiceRuntime {
        ServiceRuntime {
            app: AppSection { name: "test".to_string(), version: "0.0.0".to_string(), environment: "test".to_string() },
            grpc: GrpcSection {
                port: 0,
                max_recv_msg_size: 0,
                max_send_msg_size: 0,
                max_concurrent_conn: 0,
                keep_alive_secs: 0,
                keep_alive_timeout_secs: 0,
                tls_enabled: false,
                tls_cert_path: None,
                tls_key_path: None,
            },
            metrics: MetricsSection { enabled: false, port: 0, path: "/metrics".to_string(), namespace: "test".to_string() },
            rate_limiter: None,
            audit: None,
            cache: None,
            health: HealthBuilder::new().build(),
            _logging_guard: wayfare_core::logging::init(Default::default()),
            metrics_listener: None,
        }
    }

    #[test]
    fn default_chain_without_rate_limit_or_audit_has_five_links() {
        let runtime = bare_runtime();
        let chain = runtime.default_chain::<Req, String>("routing", ExclusionSet::default());
        assert_eq!(chain.len(), 5);
    }

    #[test]
    fn default_chain_grows_with_rate_limit_and_audit_enabled() {
        let mut runtime = bare_runtime();
        runtime.rate_limiter =
            Some(RateLimiter::new(wayfare_rate_limit::backend::memory::InMemoryBackend::new(), RateLimiterConfig {
                strategy: Strategy::SlidingWindow,
                requests: 100,
                window: Duration::from_secs(1),
                burst: 0,
            }));
        runtime.audit = Some(Arc::new(build_audit_pipeline(&test_audit_section())));

        let chain = runtime.default_chain::<Req, String>("routing", ExclusionSet::default());
        assert_eq!(chain.len(), 7);
    }
}
