//! Cookie parsing stage and extractor.

use std::collections::HashMap;
use std::convert::Infallible;

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, Request},
};

use crate::http::pipeline::{Outcome, Stage, StageContext};

/// Cookies sent with the request, by name. First occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cookies(HashMap<String, String>);

impl Cookies {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut cookies = HashMap::new();
        for value in headers.get_all(header::COOKIE) {
            let Ok(value) = value.to_str() else {
                continue;
            };
            for (name, value) in parse_pairs(value) {
                cookies.entry(name).or_insert(value);
            }
        }
        Self(cookies)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn parse_pairs(header: &str) -> impl Iterator<Item = (String, String)> + '_ {
    header.split(';').filter_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);
        let value = urlencoding::decode(value)
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| value.to_string());
        Some((name.to_string(), value))
    })
}

/// Makes [`Cookies`] available to handlers. Never rejects.
pub struct CookieParser;

#[async_trait]
impl Stage for CookieParser {
    fn name(&self) -> &'static str {
        "cookies"
    }

    async fn process(&self, mut request: Request<Body>, _ctx: &mut StageContext) -> Outcome {
        let cookies = Cookies::from_headers(request.headers());
        if !cookies.is_empty() {
            tracing::trace!(count = cookies.len(), "Parsed cookies");
        }
        request.extensions_mut().insert(cookies);
        Outcome::Continue(request)
    }
}

impl<S> FromRequestParts<S> for Cookies
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Cookies>()
            .cloned()
            .unwrap_or_else(|| Cookies::from_headers(&parts.headers)))
    }
}
