//! Rate limiting middleware for API routes

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::data::rate_limit::{RateLimitResult, RateLimiter, now_ms};

/// Rate limit middleware state
#[derive(Clone)]
pub struct RateLimitState {
    pub limiter: RateLimiter,
}

/// Rate limit exceeded response
pub struct RateLimitExceeded {
    result: RateLimitResult,
    limit: u32,
    now_ms: u64,
}

impl IntoResponse for RateLimitExceeded {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": "too_many_requests",
            "code": "RATE_LIMITED",
            "message": "Rate limit exceeded, retry later"
        });
        let mut response = (StatusCode::TOO_MANY_REQUESTS, body.to_string()).into_response();

        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::RETRY_AFTER,
            HeaderValue::from(self.result.retry_after_secs(self.now_ms)),
        );
        add_rate_limit_headers(headers, &self.result, self.limit);

        response
    }
}

/// Add `X-RateLimit-*` headers; the reset is sent in epoch seconds
fn add_rate_limit_headers(headers: &mut HeaderMap, result: &RateLimitResult, limit: u32) {
    headers.insert("X-RateLimit-Limit", HeaderValue::from(limit));
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(result.remaining));
    headers.insert(
        "X-RateLimit-Reset",
        HeaderValue::from(result.reset_time.div_ceil(1000)),
    );
}

/// Identify the client: first `X-Forwarded-For` entry, then `X-Real-IP`,
/// then the peer address
pub fn client_identifier(request: &Request<Body>) -> String {
    let headers = request.headers();
    let forwarded = headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let real_ip = || {
        headers
            .get("X-Real-IP")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };

    forwarded
        .or_else(real_ip)
        .map(str::to_string)
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Rate limiting middleware function
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitExceeded> {
    let identifier = client_identifier(&request);
    let limit = state.limiter.budget().max_requests;

    let now = now_ms();
    let result = state.limiter.check_limit_at(&identifier, now).await;

    if !result.allowed {
        tracing::debug!(
            prefix = %state.limiter.budget().key_prefix,
            %identifier,
            total_requests = result.total_requests,
            "Rate limit exceeded"
        );
        return Err(RateLimitExceeded {
            result,
            limit,
            now_ms: now,
        });
    }

    let mut response = next.run(request).await;
    add_rate_limit_headers(response.headers_mut(), &result, limit);
    Ok(response)
}
