//! Input sanitization.
//!
//! Two independent passes over the JSON body and the query string:
//! - operator keys (`$`-prefixed or dotted) are dropped so user input can
//!   never become a document-store query operator
//! - `<` in keys and string values is escaped to `&lt;` so stored or
//!   reflected markup cannot execute
//!
//! Path parameters do not exist until routing runs after the pipeline, so
//! handlers take them through [`CleanPath`], which applies the same escape.

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::{FromRequestParts, Path},
    http::{header, request::Parts, uri::PathAndQuery, HeaderValue, Request, Uri},
};
use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::http::error::ApiError;
use crate::http::pipeline::{Outcome, Stage, StageContext};
use crate::security::limits::ParsedBody;

/// Whether a key could be interpreted as a query operator or path.
pub fn is_operator_key(key: &str) -> bool {
    key.starts_with('$') || key.contains('.')
}

/// Bracketed query keys (`user[$ne]`) are checked segment by segment.
fn is_operator_query_key(key: &str) -> bool {
    key.contains('.')
        || key
            .split(['[', ']'])
            .any(|segment| segment.starts_with('$'))
}

/// Neutralise markup in a string.
pub fn escape_markup(value: &str) -> String {
    value.replace('<', "&lt;")
}

/// Sanitize a JSON value in place. Returns true if anything changed.
pub fn sanitize_value(value: &mut Value) -> bool {
    match value {
        Value::String(s) => {
            if s.contains('<') {
                *s = escape_markup(s);
                true
            } else {
                false
            }
        }
        Value::Array(items) => items
            .iter_mut()
            .fold(false, |changed, item| sanitize_value(item) || changed),
        Value::Object(map) => {
            let mut changed = false;
            let mut cleaned = Map::with_capacity(map.len());
            for (key, mut item) in std::mem::take(map) {
                if is_operator_key(&key) {
                    tracing::debug!(key = %key, "Dropped operator key");
                    changed = true;
                    continue;
                }
                changed |= sanitize_value(&mut item);
                let key = if key.contains('<') {
                    changed = true;
                    escape_markup(&key)
                } else {
                    key
                };
                cleaned.insert(key, item);
            }
            *map = cleaned;
            changed
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Sanitize a raw query string. Returns `None` when nothing changed.
pub fn sanitize_query(query: &str) -> Option<String> {
    let mut changed = false;
    let mut serializer = form_urlencoded::Serializer::new(String::new());

    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        if is_operator_query_key(&key) {
            tracing::debug!(key = %key, "Dropped operator query key");
            changed = true;
            continue;
        }
        if key.contains('<') || value.contains('<') {
            changed = true;
        }
        serializer.append_pair(&escape_markup(&key), &escape_markup(&value));
    }

    changed.then(|| serializer.finish())
}

fn rewrite_query(uri: &Uri, query: &str) -> Option<Uri> {
    let path_and_query = if query.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), query)
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query).ok()?);
    Uri::from_parts(parts).ok()
}

/// Pipeline stage applying both passes to every request.
pub struct Sanitizer;

#[async_trait]
impl Stage for Sanitizer {
    fn name(&self) -> &'static str {
        "sanitize"
    }

    async fn process(&self, request: Request<Body>, _ctx: &mut StageContext) -> Outcome {
        let (mut parts, body) = request.into_parts();

        if let Some(query) = parts.uri.query() {
            if let Some(clean) = sanitize_query(query) {
                match rewrite_query(&parts.uri, &clean) {
                    Some(uri) => parts.uri = uri,
                    None => tracing::warn!("Could not rebuild sanitized URI"),
                }
            }
        }

        let body = match parts.extensions.remove::<ParsedBody>() {
            Some(ParsedBody(mut value)) => {
                if sanitize_value(&mut value) {
                    let bytes = serde_json::to_vec(&value).unwrap_or_default();
                    parts
                        .headers
                        .insert(header::CONTENT_LENGTH, HeaderValue::from(bytes.len()));
                    parts.extensions.insert(ParsedBody(value));
                    Body::from(bytes)
                } else {
                    parts.extensions.insert(ParsedBody(value));
                    body
                }
            }
            None => body,
        };

        Outcome::Continue(Request::from_parts(parts, body))
    }
}

/// Single path parameter with markup escaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanPath(pub String);

impl<S> FromRequestParts<S> for CleanPath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        Ok(CleanPath(escape_markup(&raw)))
    }
}
