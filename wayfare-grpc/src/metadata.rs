//! gRPC-metadata extraction helpers shared by several interceptors:
//! building a [`RequestMeta`] for the rate limiter and pulling caller
//! identity fields for the audit interceptor.

use tonic::Request;
use wayfare_rate_limit::RequestMeta;

fn ascii_header<T>(req: &Request<T>, key: &str) -> Option<String> {
    req.metadata().get(key).and_then(|v| v.to_str().ok()).map(str::to_string)
}

/// Builds the [`RequestMeta`] the rate limiter's key extractors read,
/// capturing `x-forwarded-for`/`x-real-ip`/`x-user-id` and the transport
/// peer address.
pub fn request_meta<T>(method: &str, req: &Request<T>) -> RequestMeta {
    let mut meta = RequestMeta::new(method);
    for header in ["x-forwarded-for", "x-real-ip", "x-user-id"] {
        if let Some(value) = ascii_header(req, header) {
            meta = meta.with_header(header, value);
        }
    }
    if let Some(addr) = req.remote_addr() {
        meta = meta.with_peer_addr(addr.to_string());
    }
    meta
}

/// Caller identity derived from standard metadata keys, per §4.8.2 item 7.
#[derive(Debug, Clone, Default)]
pub struct CallerIdentity {
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub request_id: Option<String>,
    pub client_ip: Option<String>,
}

/// Extracts identity fields from `x-user-id`/`x-username`/`x-request-id`
/// metadata, falling back to the transport peer address for the client IP
/// when no forwarding header is present.
pub fn extract_identity<T>(req: &Request<T>) -> CallerIdentity {
    let client_ip = ascii_header(req, "x-forwarded-for")
        .or_else(|| ascii_header(req, "x-real-ip"))
        .or_else(|| req.remote_addr().map(|a| a.to_string()));

    CallerIdentity {
        user_id: ascii_header(req, "x-user-id"),
        username: ascii_header(req, "x-username"),
        request_id: ascii_header(req, "x-request-id"),
        client_ip,
    }
}
