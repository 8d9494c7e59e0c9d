//! Security response headers.
//!
//! # Responsibilities
//! - Attach the standard hardening header set to every response
//! - Run first so even rejected requests carry the headers
//!
//! # Design Decisions
//! - Fixed defaults, no per-route configuration
//! - `X-XSS-Protection` is disabled explicitly; the legacy auditor does more
//!   harm than good in browsers that still ship it

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
};

use crate::http::pipeline::{Outcome, Stage, StageContext};

const CONTENT_SECURITY_POLICY: &str = "default-src 'self';base-uri 'self';font-src 'self' https: data:;\
form-action 'self';frame-ancestors 'self';img-src 'self' data:;object-src 'none';\
script-src 'self';script-src-attr 'none';style-src 'self' https: 'unsafe-inline';\
upgrade-insecure-requests";

/// Header name/value pairs applied to every response.
pub const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("content-security-policy", CONTENT_SECURITY_POLICY),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-origin"),
    ("origin-agent-cluster", "?1"),
    ("referrer-policy", "no-referrer"),
    ("strict-transport-security", "max-age=15552000; includeSubDomains"),
    ("x-content-type-options", "nosniff"),
    ("x-dns-prefetch-control", "off"),
    ("x-download-options", "noopen"),
    ("x-frame-options", "SAMEORIGIN"),
    ("x-permitted-cross-domain-policies", "none"),
    ("x-xss-protection", "0"),
];

/// Pipeline stage that schedules [`SECURITY_HEADERS`] on the response.
pub struct SecurityHeaders {
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl SecurityHeaders {
    pub fn new() -> Self {
        let headers = SECURITY_HEADERS
            .iter()
            .map(|&(name, value)| {
                (
                    HeaderName::from_static(name),
                    HeaderValue::from_static(value),
                )
            })
            .collect();
        Self { headers }
    }
}

impl Default for SecurityHeaders {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Stage for SecurityHeaders {
    fn name(&self) -> &'static str {
        "security_headers"
    }

    async fn process(&self, request: Request<Body>, ctx: &mut StageContext) -> Outcome {
        for (name, value) in &self.headers {
            ctx.set_response_header(name.clone(), value.clone());
        }
        Outcome::Continue(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_all_headers_scheduled() {
        let mut ctx = StageContext::default();
        let request = Request::builder().body(Body::empty()).unwrap();
        let outcome = SecurityHeaders::new().process(request, &mut ctx).await;

        assert!(matches!(outcome, Outcome::Continue(_)));
        let headers = ctx.response_headers();
        assert_eq!(headers.len(), SECURITY_HEADERS.len());
        assert_eq!(headers["x-frame-options"], "SAMEORIGIN");
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert!(headers["content-security-policy"]
            .to_str()
            .unwrap()
            .starts_with("default-src 'self'"));
    }
}
