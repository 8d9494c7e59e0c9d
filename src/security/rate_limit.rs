//! Fixed-window rate limiting per client IP.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
};
use dashmap::DashMap;
use tokio::time::Instant;

use crate::config::RateLimitConfig;
use crate::http::error::ApiError;
use crate::http::pipeline::{Outcome, Stage, StageContext};
use crate::http::request::{client_ip, peer_addr};
use crate::observability::metrics;

/// Counter for one client within the current window.
#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    hits: u32,
}

/// Result of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time until the window resets.
    pub reset_after: Duration,
}

/// Per-IP request counters over fixed windows.
pub struct FixedWindowLimiter {
    windows: DashMap<IpAddr, Window>,
    window: Duration,
    max_requests: u32,
}

impl FixedWindowLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            windows: DashMap::new(),
            window,
            max_requests,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(Duration::from_millis(config.window_ms), config.max_requests)
    }

    /// Count a request from `ip`. Requests over the ceiling still count.
    pub fn check(&self, ip: IpAddr) -> Decision {
        let now = Instant::now();
        let mut entry = self.windows.entry(ip).or_insert(Window {
            started: now,
            hits: 0,
        });

        if now.duration_since(entry.started) >= self.window {
            *entry = Window {
                started: now,
                hits: 0,
            };
        }
        entry.hits = entry.hits.saturating_add(1);

        let elapsed = now.duration_since(entry.started);
        Decision {
            allowed: entry.hits <= self.max_requests,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(entry.hits),
            reset_after: self.window.saturating_sub(elapsed),
        }
    }

    /// Drop windows that have already elapsed. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows
            .retain(|_, w| now.duration_since(w.started) < self.window);
        before.saturating_sub(self.windows.len())
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

const RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
const RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
const RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

/// Pipeline stage applying a [`FixedWindowLimiter`] to one path prefix.
pub struct RateLimit {
    limiter: Arc<FixedWindowLimiter>,
    path_prefix: String,
    trusted_hops: usize,
}

impl RateLimit {
    pub fn new(limiter: Arc<FixedWindowLimiter>, config: &RateLimitConfig) -> Self {
        Self {
            limiter,
            path_prefix: config.path_prefix.clone(),
            trusted_hops: config.trust_proxy_hops,
        }
    }

    fn applies_to(&self, path: &str) -> bool {
        match path.strip_prefix(self.path_prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/') || self.path_prefix.ends_with('/'),
            None => false,
        }
    }
}

#[async_trait]
impl Stage for RateLimit {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    async fn process(&self, request: Request<Body>, ctx: &mut StageContext) -> Outcome {
        if !self.applies_to(request.uri().path()) {
            return Outcome::Continue(request);
        }

        let peer = peer_addr(&request).unwrap_or_else(|| {
            tracing::debug!("No connection info on request, counting as unspecified peer");
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        });
        let ip = client_ip(peer, request.headers(), self.trusted_hops);
        let decision = self.limiter.check(ip);

        ctx.set_response_header(RATELIMIT_LIMIT, HeaderValue::from(decision.limit));
        ctx.set_response_header(
            RATELIMIT_REMAINING,
            HeaderValue::from(decision.remaining),
        );
        ctx.set_response_header(
            RATELIMIT_RESET,
            HeaderValue::from(decision.reset_after.as_secs_f64().ceil() as u64),
        );

        if decision.allowed {
            Outcome::Continue(request)
        } else {
            tracing::warn!(client = %ip, limit = decision.limit, "Rate limit exceeded");
            metrics::record_rate_limited();
            Outcome::Reject(ApiError::RateLimited)
        }
    }
}
