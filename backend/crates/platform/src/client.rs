//! Client identification utilities
//!
//! Derives the identity a request is rate limited under.

use axum::http::HeaderMap;
use std::net::IpAddr;

/// Admission key used when no address can be determined
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Extract client IP address from headers
///
/// Checks X-Forwarded-For header first (for reverse proxy setups),
/// then falls back to direct connection IP.
///
/// ## Arguments
/// * `headers` - HTTP request headers
/// * `direct_ip` - Direct connection IP address
pub fn extract_client_ip(headers: &HeaderMap, direct_ip: Option<IpAddr>) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|xff| xff.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok())
        .or(direct_ip)
}

/// Resolve the address a request is admitted under
///
/// `X-Forwarded-For` is client-controlled, so it is only consulted when the
/// service sits behind a proxy that overwrites it. Otherwise the peer
/// address is authoritative.
pub fn resolve_client_ip(
    headers: &HeaderMap,
    direct_ip: Option<IpAddr>,
    trust_forwarded_for: bool,
) -> Option<IpAddr> {
    if trust_forwarded_for {
        extract_client_ip(headers, direct_ip)
    } else {
        direct_ip
    }
}

/// Rate limit key for a client. Never empty.
pub fn client_key(ip: Option<IpAddr>) -> String {
    match ip {
        Some(ip) => ip.to_string(),
        None => UNKNOWN_CLIENT.to_string(),
    }
}
