//! Cross-origin gate.
//!
//! # Responsibilities
//! - Accept or reject the declared `Origin` against the allow-list
//! - Answer accepted preflight (`OPTIONS`) requests directly
//! - Schedule CORS response headers for accepted origins
//!
//! # Design Decisions
//! - No `Origin` header (curl, mobile apps, server-to-server) is accepted
//! - Exact string match on origins, no wildcards
//! - Rejections are rendered by the error formatter as 403

use std::collections::HashSet;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderValue, Method, Request, StatusCode},
    response::{IntoResponse, Response},
};

use crate::config::CorsConfig;
use crate::http::error::ApiError;
use crate::http::pipeline::{Outcome, Stage, StageContext};
use crate::observability::metrics;

pub struct CorsGate {
    allowed_origins: HashSet<String>,
    allow_credentials: bool,
    allow_methods: HeaderValue,
    allow_headers: HeaderValue,
    expose_headers: HeaderValue,
    max_age: HeaderValue,
}

impl CorsGate {
    pub fn new(config: &CorsConfig) -> Self {
        Self {
            allowed_origins: config.allowed_origins.iter().cloned().collect(),
            allow_credentials: config.allow_credentials,
            allow_methods: join_header(&config.allowed_methods),
            allow_headers: join_header(&config.allowed_headers),
            expose_headers: join_header(&config.exposed_headers),
            max_age: HeaderValue::from(config.max_age_secs),
        }
    }

    pub fn is_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.contains(origin)
    }

    fn schedule_headers(&self, origin: Option<&HeaderValue>, ctx: &mut StageContext) {
        if let Some(origin) = origin {
            ctx.set_response_header(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
            ctx.append_response_header(header::VARY, HeaderValue::from_static("Origin"));
        }
        if self.allow_credentials {
            ctx.set_response_header(
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }
        ctx.set_response_header(
            header::ACCESS_CONTROL_EXPOSE_HEADERS,
            self.expose_headers.clone(),
        );
    }

    fn preflight(&self, ctx: &mut StageContext) -> Response {
        ctx.set_response_header(header::ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone());
        ctx.set_response_header(header::ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.clone());
        ctx.set_response_header(header::ACCESS_CONTROL_MAX_AGE, self.max_age.clone());

        let mut response = StatusCode::NO_CONTENT.into_response();
        response
            .headers_mut()
            .insert(header::CONTENT_LENGTH, HeaderValue::from_static("0"));
        response
    }
}

fn join_header(values: &[String]) -> HeaderValue {
    HeaderValue::from_str(&values.join(",")).unwrap_or_else(|_| HeaderValue::from_static(""))
}

#[async_trait]
impl Stage for CorsGate {
    fn name(&self) -> &'static str {
        "cors"
    }

    async fn process(&self, request: Request<Body>, ctx: &mut StageContext) -> Outcome {
        let origin = request.headers().get(header::ORIGIN).cloned();

        if let Some(value) = &origin {
            let declared = value.to_str().unwrap_or_default();
            if !self.is_allowed(declared) {
                tracing::warn!(
                    origin = %declared,
                    method = %request.method(),
                    path = %request.uri().path(),
                    "Rejected origin"
                );
                metrics::record_cors_rejected();
                return Outcome::Reject(ApiError::CorsRejected {
                    origin: declared.to_string(),
                });
            }
            tracing::debug!(origin = %declared, "Accepted origin");
        }

        self.schedule_headers(origin.as_ref(), ctx);

        if request.method() == Method::OPTIONS {
            return Outcome::Respond(self.preflight(ctx));
        }
        Outcome::Continue(request)
    }
}
