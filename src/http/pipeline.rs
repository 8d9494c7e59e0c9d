//! Ordered request pipeline.
//!
//! Every inbound request runs through the configured [`Stage`]s in order
//! before it reaches the router. A stage either hands the (possibly
//! rewritten) request on, answers it directly, or rejects it with an
//! [`ApiError`]. Headers a stage wants on the response are collected in the
//! [`StageContext`] and applied to whatever response ends up being sent,
//! including error responses.
//!
//! The runner is also the single place where error bodies are finalised:
//! any response carrying an [`ErrorReport`] is re-rendered for the current
//! environment.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::Environment;
use crate::http::error::{ApiError, ErrorReport};
use crate::observability::metrics;

/// Result of running one stage.
pub enum Outcome {
    /// Pass the request to the next stage.
    Continue(Request<Body>),
    /// Answer immediately; later stages and the router are skipped.
    Respond(Response),
    /// Fail the request.
    Reject(ApiError),
}

/// Per-request scratch space shared by the stages.
#[derive(Debug, Default)]
pub struct StageContext {
    response_headers: HeaderMap,
}

impl StageContext {
    /// Set a header on the eventual response.
    pub fn set_response_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.response_headers.insert(name, value);
    }

    /// Add a value to a list-valued header such as `Vary`.
    pub fn append_response_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.response_headers.append(name, value);
    }

    pub fn response_headers(&self) -> &HeaderMap {
        &self.response_headers
    }
}

/// One step of the pipeline.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn process(&self, request: Request<Body>, ctx: &mut StageContext) -> Outcome;
}

/// Explicitly ordered list of stages plus the error formatter.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
    environment: Environment,
}

impl Pipeline {
    pub fn new(environment: Environment) -> Self {
        Self {
            stages: Vec::new(),
            environment,
        }
    }

    /// Append a stage; stages run in insertion order.
    pub fn with_stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run all stages, then `dispatch` if none of them answered.
    pub async fn handle<F, Fut>(&self, request: Request<Body>, dispatch: F) -> Response
    where
        F: FnOnce(Request<Body>) -> Fut,
        Fut: Future<Output = Response>,
    {
        let start = Instant::now();
        let method = request.method().clone();
        let path = request.uri().path().to_string();
        let mut ctx = StageContext::default();

        let mut current = request;
        let response = 'stages: {
            for stage in &self.stages {
                current = match stage.process(current, &mut ctx).await {
                    Outcome::Continue(request) => request,
                    Outcome::Respond(response) => {
                        tracing::debug!(stage = stage.name(), %method, %path, "Request answered by stage");
                        break 'stages response;
                    }
                    Outcome::Reject(err) => {
                        tracing::debug!(stage = stage.name(), %method, %path, error = %err, "Request rejected by stage");
                        break 'stages err.into_response();
                    }
                };
            }
            dispatch(current).await
        };

        let mut response = self.format_error(response);
        apply_headers(&ctx.response_headers, response.headers_mut());

        let status = response.status();
        if status.is_server_error() {
            tracing::error!(%method, %path, status = status.as_u16(), "Request failed");
        }
        metrics::record_request(method.as_str(), status.as_u16(), start);
        response
    }

    /// Centralised error formatting: one rendering per error response.
    /// Error statuses produced outside `ApiError` (framework 405s, the
    /// timeout layer's 408) are given a report here.
    fn format_error(&self, response: Response) -> Response {
        let status = response.status();
        let (report, bare) = match response.extensions().get::<ErrorReport>() {
            Some(report) => (report.clone(), false),
            None if status.is_client_error() || status.is_server_error() => {
                (ApiError::from_status(status).report(), true)
            }
            None => return response,
        };

        if report.status.is_server_error() {
            tracing::error!(
                status = report.status.as_u16(),
                message = %report.message,
                detail = %report.detail,
                "Error response"
            );
        }

        if bare || self.environment.is_development() {
            report.rerender(response, self.environment)
        } else {
            response
        }
    }
}

/// `Vary` is merged with whatever the handler set; other stage headers
/// replace it.
fn apply_headers(from: &HeaderMap, to: &mut HeaderMap) {
    for name in from.keys() {
        let mut values = from.get_all(name).iter();
        if name == header::VARY {
            for value in values {
                to.append(name.clone(), value.clone());
            }
        } else if let Some(first) = values.next() {
            to.insert(name.clone(), first.clone());
            for value in values {
                to.append(name.clone(), value.clone());
            }
        }
    }
}

/// Axum middleware adapter for [`Pipeline`].
pub async fn run_pipeline(
    State(pipeline): State<Arc<Pipeline>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    pipeline.handle(request, |request| next.run(request)).await
}
