//! Sliding-window / token-bucket rate limiting, per §4.6.
//!
//! [`RateLimiter`] is the engine callers reach for: it composes a
//! [`backend::RateLimitBackend`] (in-process [`backend::memory::InMemoryBackend`]
//! or shared [`backend::shared::SharedBackend`]) with a strategy/requests/
//! window/burst envelope and a configurable [`key::KeyExtractor`].

pub mod backend;
pub mod key;
pub mod limiter;
pub mod strategy;

pub use key::{composite_extractor, ip_extractor, method_extractor, user_extractor, KeyExtractor, RequestMeta};
pub use limiter::{LimitInfo, RateLimitDenied, RateLimiter, RateLimiterConfig};
pub use strategy::{Admission, RateLimitParams, Strategy};
