//! Key extraction: turns an inbound call into the string a
//! [`crate::RateLimiter`] keys its buckets on.

use std::collections::BTreeMap;
use std::sync::Arc;

/// The slice of an inbound call a key extractor is allowed to look at.
/// Headers are expected lower-cased, matching gRPC metadata conventions.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub peer_addr: Option<String>,
}

impl RequestMeta {
    pub fn new(method: impl Into<String>) -> Self {
        Self { method: method.into(), headers: BTreeMap::new(), peer_addr: None }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_peer_addr(mut self, addr: impl Into<String>) -> Self {
        self.peer_addr = Some(addr.into());
        self
    }
}

/// A configurable `(ctx, method, metadata) -> key` function, per §4.6.4.
pub type KeyExtractor = Arc<dyn Fn(&RequestMeta) -> String + Send + Sync>;

/// Prefers `x-forwarded-for`, then `x-real-ip`, then the peer authority,
/// then the literal `"unknown"`. This is the default extractor.
pub fn ip_extractor() -> KeyExtractor {
    Arc::new(|meta: &RequestMeta| {
        if let Some(v) = meta.headers.get("x-forwarded-for") {
            return v.split(',').next().unwrap_or(v).trim().to_string();
        }
        if let Some(v) = meta.headers.get("x-real-ip") {
            return v.clone();
        }
        if let Some(peer) = &meta.peer_addr {
            return peer.clone();
        }
        "unknown".to_string()
    })
}

/// Keys by RPC method name.
pub fn method_extractor() -> KeyExtractor {
    Arc::new(|meta: &RequestMeta| meta.method.clone())
}

/// Prefers `x-user-id`, falling back to [`ip_extractor`].
pub fn user_extractor() -> KeyExtractor {
    let fallback = ip_extractor();
    Arc::new(move |meta: &RequestMeta| {
        meta.headers.get("x-user-id").cloned().unwrap_or_else(|| fallback(meta))
    })
}

/// Concatenates the outputs of several extractors with `:` separators.
pub fn composite_extractor(parts: Vec<KeyExtractor>) -> KeyExtractor {
    Arc::new(move |meta: &RequestMeta| {
        parts.iter().map(|p| p(meta)).collect::<Vec<_>>().join(":")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ip_extractor_prefers_forwarded_for() {
        let meta = RequestMeta::new("Solve")
            .with_header("x-forwarded-for", "1.2.3.4, 5.6.7.8")
            .with_header("x-real-ip", "9.9.9.9");
        assert_eq!(ip_extractor()(&meta), "1.2.3.4");
    }

    #[test]
    fn ip_extractor_falls_back_through_real_ip_then_peer_then_unknown() {
        let meta = RequestMeta::new("Solve").with_header("x-real-ip", "9.9.9.9");
        assert_eq!(ip_extractor()(&meta), "9.9.9.9");

        let meta = RequestMeta::new("Solve").with_peer_addr("10.0.0.1:443");
        assert_eq!(ip_extractor()(&meta), "10.0.0.1:443");

        let meta = RequestMeta::new("Solve");
        assert_eq!(ip_extractor()(&meta), "unknown");
    }

    #[test]
    fn user_extractor_prefers_user_id_header() {
        let meta = RequestMeta::new("Solve").with_header("x-user-id", "u-42");
        assert_eq!(user_extractor()(&meta), "u-42");
    }

    #[test]
    fn method_extractor_returns_the_rpc_method() {
        let meta = RequestMeta::new("wayfare.RoutingService/Solve");
        assert_eq!(method_extractor()(&meta), "wayfare.RoutingService/Solve");
    }

    #[test]
    fn composite_extractor_joins_with_colon() {
        let meta = RequestMeta::new("Solve").with_header("x-user-id", "u-42");
        let extractor = composite_extractor(vec![method_extractor(), user_extractor()]);
        assert_eq!(extractor(&meta), "Solve:u-42");
    }
}
