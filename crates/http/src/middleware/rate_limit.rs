//! Per-client rate limiting for expensive routes.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use blogsmith_ratelimit::{FixedWindowLimiter, RateDecision};

use crate::error::{ceil_secs, AppError};
use crate::middleware::client_ip::client_key;

pub const RATE_LIMIT_MESSAGE: &str =
    "Too many requests. Please wait a moment before trying again.";

static RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
static RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
static RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

/// State shared by every request passing through [`enforce_rate_limit`].
#[derive(Clone, Debug)]
pub struct RateLimitState {
    limiter: Arc<FixedWindowLimiter>,
    trusted_proxy_hops: usize,
}

impl RateLimitState {
    pub fn new(limiter: Arc<FixedWindowLimiter>, trusted_proxy_hops: usize) -> Self {
        Self {
            limiter,
            trusted_proxy_hops,
        }
    }

    pub fn limiter(&self) -> &Arc<FixedWindowLimiter> {
        &self.limiter
    }
}

pub async fn enforce_rate_limit(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = client_key(request.headers(), peer, state.trusted_proxy_hops);

    match state.limiter.check(&key) {
        RateDecision::Allowed {
            limit,
            remaining,
            reset_after,
        } => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert(RATELIMIT_LIMIT.clone(), HeaderValue::from(limit));
            headers.insert(RATELIMIT_REMAINING.clone(), HeaderValue::from(remaining));
            headers.insert(
                RATELIMIT_RESET.clone(),
                HeaderValue::from(ceil_secs(reset_after)),
            );
            response
        }
        RateDecision::Limited { retry_after, .. } => {
            tracing::warn!(client = %key, "rate limit exceeded");
            AppError::too_many_requests(RATE_LIMIT_MESSAGE, retry_after).into_response()
        }
    }
}
