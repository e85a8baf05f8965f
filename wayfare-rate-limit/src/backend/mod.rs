//! Pluggable rate-limit storage. Mirrors `wayfare_audit::AuditSink`'s
//! trait-plus-object-safe-erased-wrapper shape.

pub mod memory;
pub mod shared;

use std::future::Future;
use std::pin::Pin;

use wayfare_core::CoreError;

use crate::strategy::{Admission, RateLimitParams};
use crate::LimitInfo;

/// A storage backend for admission state. In-process (`memory`) and shared
/// (`shared`, backed by an external store) implementations are provided;
/// both are consumed through the same trait by [`crate::RateLimiter`].
pub trait RateLimitBackend: Send + Sync + 'static {
    fn allow_n(&self, key: &str, params: RateLimitParams, n: u64) -> impl Future<Output = Result<Admission, CoreError>> + Send;

    fn reset(&self, key: &str, params: RateLimitParams) -> impl Future<Output = Result<(), CoreError>> + Send;

    fn get_info(&self, key: &str, params: RateLimitParams) -> impl Future<Output = Result<LimitInfo, CoreError>> + Send;

    fn close(&self) -> impl Future<Output = Result<(), CoreError>> + Send {
        std::future::ready(Ok(()))
    }
}

pub(crate) trait RateLimitBackendErased: Send + Sync + 'static {
    fn allow_n<'a>(&'a self, key: &'a str, params: RateLimitParams, n: u64) -> Pin<Box<dyn Future<Output = Result<Admission, CoreError>> + Send + 'a>>;
    fn reset<'a>(&'a self, key: &'a str, params: RateLimitParams) -> Pin<Box<dyn Future<Output = Result<(), CoreError>> + Send + 'a>>;
    fn get_info<'a>(&'a self, key: &'a str, params: RateLimitParams) -> Pin<Box<dyn Future<Output = Result<LimitInfo, CoreError>> + Send + 'a>>;
    fn close<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<(), CoreError>> + Send + 'a>>;
}

impl<T: RateLimitBackend> RateLimitBackendErased for T {
    fn allow_n<'a>(&'a self, key: &'a str, params: RateLimitParams, n: u64) -> Pin<Box<dyn Future<Output = Result<Admission, CoreError>> + Send + 'a>> {
        Box::pin(RateLimitBackend::allow_n(self, key, params, n))
    }

    fn reset<'a>(&'a self, key: &'a str, params: RateLimitParams) -> Pin<Box<dyn Future<Output = Result<(), CoreError>> + Send + 'a>> {
        Box::pin(RateLimitBackend::reset(self, key, params))
    }

    fn get_info<'a>(&'a self, key: &'a str, params: RateLimitParams) -> Pin<Box<dyn Future<Output = Result<LimitInfo, CoreError>> + Send + 'a>> {
        Box::pin(RateLimitBackend::get_info(self, key, params))
    }

    fn close<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<(), CoreError>> + Send + 'a>> {
        Box::pin(RateLimitBackend::close(self))
    }
}
