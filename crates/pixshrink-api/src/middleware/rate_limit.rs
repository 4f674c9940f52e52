use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use pixshrink_core::constants::API_PREFIX;
use pixshrink_infra::{ErrorResponse, RateLimiter};

use crate::utils::ip_extraction::extract_client_ip;

pub const RATE_LIMIT_MESSAGE: &str = "Too many requests, please try again later.";

/// Limiter plus how far to trust forwarding headers
#[derive(Clone)]
pub struct RateLimitState {
    pub limiter: Arc<RateLimiter>,
    pub trusted_proxy_count: usize,
}

fn set_header(headers: &mut HeaderMap, name: &'static str, value: u64) {
    if let Ok(value) = HeaderValue::from_str(&value.to_string()) {
        headers.insert(name, value);
    }
}

/// Per-IP fixed-window limit on everything under `/api`
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    if !request.uri().path().starts_with(API_PREFIX) {
        return next.run(request).await;
    }

    let socket_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let client_ip = extract_client_ip(
        request.headers(),
        socket_addr.as_ref(),
        state.trusted_proxy_count,
    );
    let key = format!("ip:{}", client_ip);
    let limit = u64::from(state.limiter.limit());

    match state.limiter.check(&key).await {
        Ok(status) => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            set_header(headers, "x-ratelimit-limit", limit);
            set_header(headers, "x-ratelimit-remaining", u64::from(status.remaining));
            set_header(headers, "x-ratelimit-reset", status.reset_in.as_secs());
            response
        }
        Err(retry_after) => {
            let retry_secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            tracing::warn!(
                client_ip = %client_ip,
                path = %request.uri().path(),
                retry_after_secs = retry_secs,
                "Rate limit exceeded"
            );

            let body = ErrorResponse::new(RATE_LIMIT_MESSAGE).with_code("RATE_LIMIT_EXCEEDED");
            let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
            let headers = response.headers_mut();
            set_header(headers, "x-ratelimit-limit", limit);
            set_header(headers, "x-ratelimit-remaining", 0);
            set_header(headers, "retry-after", retry_secs);
            response
        }
    }
}
