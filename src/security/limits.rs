//! Request body limits and JSON parsing.
//!
//! # Responsibilities
//! - Enforce maximum request body size
//! - Parse JSON bodies once so later stages can inspect them
//!
//! # Design Decisions
//! - Declared Content-Length is checked before reading (early rejection)
//! - Bodies without a length are read up to the limit and rejected past it
//! - Return 413 Payload Too Large or 400 for malformed JSON

use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, Request},
};
use serde_json::Value;

use crate::http::error::ApiError;
use crate::http::pipeline::{Outcome, Stage, StageContext};

/// A JSON body that has already been parsed by [`BodyParser`].
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBody(pub Value);

/// Buffers the body under a size ceiling and parses JSON payloads.
pub struct BodyParser {
    limit: usize,
}

impl BodyParser {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }
}

/// `application/json` and `application/*+json`.
pub fn is_json(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

#[async_trait]
impl Stage for BodyParser {
    fn name(&self) -> &'static str {
        "body"
    }

    async fn process(&self, request: Request<Body>, _ctx: &mut StageContext) -> Outcome {
        if declared_length(request.headers()).is_some_and(|len| len > self.limit) {
            return Outcome::Reject(ApiError::PayloadTooLarge { limit: self.limit });
        }

        let (mut parts, body) = request.into_parts();
        let bytes: Bytes = match axum::body::to_bytes(body, self.limit).await {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::debug!(error = %err, limit = self.limit, "Body read failed");
                return Outcome::Reject(ApiError::PayloadTooLarge { limit: self.limit });
            }
        };

        if !bytes.is_empty() && is_json(&parts.headers) {
            match serde_json::from_slice::<Value>(&bytes) {
                Ok(value) => {
                    parts.extensions.insert(ParsedBody(value));
                }
                Err(err) => return Outcome::Reject(ApiError::MalformedBody(err)),
            }
        }

        Outcome::Continue(Request::from_parts(parts, Body::from(bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn json_request(body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/users")
            .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
            .body(body.into())
            .unwrap()
    }

    #[tokio::test]
    async fn test_small_json_parsed() {
        let mut ctx = StageContext::default();
        let outcome = BodyParser::new(10 * 1024)
            .process(json_request(r#"{"name":"ada"}"#), &mut ctx)
            .await;

        let Outcome::Continue(request) = outcome else {
            panic!("small body must pass");
        };
        assert_eq!(
            request.extensions().get::<ParsedBody>(),
            Some(&ParsedBody(serde_json::json!({"name": "ada"})))
        );
        let bytes = axum::body::to_bytes(request.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], br#"{"name":"ada"}"#);
    }

    #[tokio::test]
    async fn test_declared_oversize_rejected() {
        let mut request = json_request(Body::empty());
        request
            .headers_mut()
            .insert(header::CONTENT_LENGTH, "20000".parse().unwrap());
        let mut ctx = StageContext::default();
        let outcome = BodyParser::new(10 * 1024).process(request, &mut ctx).await;
        assert!(matches!(
            outcome,
            Outcome::Reject(ApiError::PayloadTooLarge { limit: 10240 })
        ));
    }

    #[tokio::test]
    async fn test_streamed_oversize_rejected() {
        let chunks = (0..11).map(|_| Ok::<_, std::io::Error>(Bytes::from(vec![b' '; 1024])));
        let body = Body::from_stream(stream::iter(chunks));
        let mut ctx = StageContext::default();
        let outcome = BodyParser::new(10 * 1024)
            .process(json_request(body), &mut ctx)
            .await;
        assert!(matches!(outcome, Outcome::Reject(ApiError::PayloadTooLarge { .. })));
    }

    #[tokio::test]
    async fn test_malformed_json_rejected() {
        let mut ctx = StageContext::default();
        let outcome = BodyParser::new(1024)
            .process(json_request("{not json"), &mut ctx)
            .await;
        assert!(matches!(outcome, Outcome::Reject(ApiError::MalformedBody(_))));
    }

    #[tokio::test]
    async fn test_non_json_passes_untouched() {
        let request = Request::builder()
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from("{not json"))
            .unwrap();
        let mut ctx = StageContext::default();
        let Outcome::Continue(request) = BodyParser::new(1024).process(request, &mut ctx).await
        else {
            panic!("plain text must pass");
        };
        assert!(request.extensions().get::<ParsedBody>().is_none());
    }

    #[test]
    fn test_is_json() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, "application/vnd.api+json".parse().unwrap());
        assert!(is_json(&headers));
        headers.insert(header::CONTENT_TYPE, "text/html".parse().unwrap());
        assert!(!is_json(&headers));
    }
}
