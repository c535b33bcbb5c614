//! Admission Middleware
//!
//! Runs every promotion request through the sliding-window limiter before
//! any handler work happens.

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use platform::client::{client_key, resolve_client_ip};
use platform::rate_limit::{Admission, SlidingWindowLimiter};
use std::net::SocketAddr;

use crate::error::PromotionError;

/// Remaining requests in the caller's current window
pub const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";

/// Limiter plus the rule for identifying the caller
#[derive(Clone)]
pub struct AdmissionState {
    pub limiter: SlidingWindowLimiter,
    /// Key clients by the first `X-Forwarded-For` entry instead of the peer
    /// address. Only safe behind a proxy that rewrites the header.
    pub trust_forwarded_for: bool,
}

impl AdmissionState {
    pub fn new(limiter: SlidingWindowLimiter, trust_forwarded_for: bool) -> Self {
        Self {
            limiter,
            trust_forwarded_for,
        }
    }
}

/// Middleware that admits or rejects a request by client key
pub async fn admission_control(
    State(admission): State<AdmissionState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let AdmissionState {
        limiter,
        trust_forwarded_for,
    } = admission;
    let direct_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip());
    let key = client_key(resolve_client_ip(
        req.headers(),
        direct_ip,
        trust_forwarded_for,
    ));

    match limiter.check(&key) {
        Admission::Allow { remaining } => {
            let mut response = next.run(req).await;
            if limiter.config().is_enabled() {
                response
                    .headers_mut()
                    .insert(RATE_LIMIT_REMAINING, HeaderValue::from(remaining));
            }
            response
        }
        Admission::Deny { retry_after } => {
            tracing::debug!(client_key = %key, "Request denied by admission control");
            PromotionError::RateLimited { retry_after }.into_response()
        }
    }
}
