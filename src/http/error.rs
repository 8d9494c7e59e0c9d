//! API error taxonomy and the single JSON error shape.
//!
//! Every failure in the request path is an [`ApiError`] variant with an
//! explicit status code and status label. Rendering happens in two steps:
//! `IntoResponse` produces the production body and attaches an
//! [`ErrorReport`] to the response extensions, and the pipeline runner
//! re-renders it once, with full detail, when running in development.

use std::error::Error as StdError;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::Environment;
use crate::mail::MailError;
use crate::store::StoreError;

/// Errors surfaced to API clients.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Origin not on the allow-list.
    #[error("CORS error: Not allowed by CORS")]
    CorsRejected { origin: String },

    /// Client exceeded its request ceiling for the current window.
    #[error("Too many requests from this IP, please try again later.")]
    RateLimited,

    /// Body exceeded the configured size ceiling.
    #[error("request entity too large")]
    PayloadTooLarge { limit: usize },

    /// Body declared as JSON did not parse.
    #[error("Invalid JSON body")]
    MalformedBody(#[source] serde_json::Error),

    /// No credentials on a protected route.
    #[error("You are not logged in! Please log in to get access.")]
    Unauthenticated,

    /// Credentials present but unknown or expired.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Authenticated but not allowed.
    #[error("You do not have permission to perform this action")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    /// Path exists but not for this method.
    #[error("Method {method} not allowed on {path}")]
    MethodNotAllowed { method: String, path: String },

    /// Handler did not finish within the request timeout.
    #[error("Request timed out")]
    Timeout,

    /// Error status produced by the framework or a tower layer without an
    /// error value of its own.
    #[error("{}", .0.canonical_reason().unwrap_or("Request failed"))]
    Status(StatusCode),

    #[error("{0}")]
    BadRequest(String),

    /// The mail collaborator refused or failed to deliver.
    #[error("Failed to send test email")]
    Mail(#[source] MailError),

    #[error("Database operation failed")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Error for a bare status that reached the formatter without a report.
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::REQUEST_TIMEOUT => ApiError::Timeout,
            _ => ApiError::Status(status),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::CorsRejected { .. } => StatusCode::FORBIDDEN,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::MalformedBody(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated | ApiError::InvalidToken => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Timeout => StatusCode::REQUEST_TIMEOUT,
            ApiError::Status(status) => *status,
            ApiError::Mail(_) | ApiError::Store(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// `"fail"` for client errors raised by handlers, `"error"` otherwise.
    /// CORS rejections are always labelled `"error"`.
    pub fn status_label(&self) -> &'static str {
        match self {
            ApiError::CorsRejected { .. } => "error",
            _ if self.status_code().is_client_error() => "fail",
            _ => "error",
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::CorsRejected { .. } => "CorsError",
            ApiError::RateLimited => "RateLimitError",
            ApiError::PayloadTooLarge { .. } => "PayloadTooLargeError",
            ApiError::MalformedBody(_) => "SyntaxError",
            ApiError::Unauthenticated | ApiError::InvalidToken => "AuthenticationError",
            ApiError::Forbidden => "AuthorizationError",
            ApiError::NotFound(_) => "NotFoundError",
            ApiError::MethodNotAllowed { .. } => "MethodNotAllowedError",
            ApiError::Timeout => "TimeoutError",
            ApiError::Status(_) => "HttpError",
            ApiError::BadRequest(_) => "ValidationError",
            ApiError::Mail(_) => "MailError",
            ApiError::Store(_) => "DatabaseError",
            ApiError::Internal(_) => "Error",
        }
    }

    /// Snapshot used by the formatter.
    pub fn report(&self) -> ErrorReport {
        let status = self.status_code();
        let label = self.status_label();

        let mut causes = Vec::new();
        let mut source = self.source();
        while let Some(err) = source {
            causes.push(err.to_string());
            source = err.source();
        }

        let mut detail = json!({
            "name": self.kind(),
            "statusCode": status.as_u16(),
            "status": label,
            "causes": causes,
        });
        match self {
            ApiError::CorsRejected { origin } => detail["origin"] = json!(origin),
            ApiError::PayloadTooLarge { limit } => detail["limit"] = json!(limit),
            _ => {}
        }

        ErrorReport {
            status,
            label,
            message: self.to_string(),
            detail,
        }
    }
}

/// Everything the formatter needs to render an error, detached from the
/// original error value so it can ride in response extensions.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub status: StatusCode,
    pub label: &'static str,
    pub message: String,
    pub detail: Value,
}

impl ErrorReport {
    /// Render `{status, message, error}`; `error` is `{}` outside development.
    pub fn render(&self, environment: Environment) -> Response {
        let error = if environment.is_development() {
            self.detail.clone()
        } else {
            json!({})
        };

        let body = json!({
            "status": self.label,
            "message": self.message,
            "error": error,
        });

        let mut response = (self.status, Json(body)).into_response();
        response.extensions_mut().insert(self.clone());
        response
    }

    /// Replace the body of an already-built error response, keeping its
    /// other headers (`Allow`, request id, stage headers).
    pub fn rerender(&self, response: Response, environment: Environment) -> Response {
        let (mut parts, _) = response.into_parts();
        let (rendered, body) = self.render(environment).into_parts();
        parts.headers.remove(header::CONTENT_LENGTH);
        if let Some(content_type) = rendered.headers.get(header::CONTENT_TYPE) {
            parts.headers.insert(header::CONTENT_TYPE, content_type.clone());
        }
        parts.extensions.insert(self.clone());
        Response::from_parts(parts, body)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.report().render(Environment::Production)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_production_body_hides_detail() {
        let response = ApiError::Internal("boom".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({"status": "error", "message": "boom", "error": {}})
        );
    }

    #[tokio::test]
    async fn test_development_body_carries_detail() {
        let report = ApiError::CorsRejected {
            origin: "https://evil.example".into(),
        }
        .report();
        let body = body_json(report.render(Environment::Development)).await;

        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "CORS error: Not allowed by CORS");
        assert_eq!(body["error"]["statusCode"], 403);
        assert_eq!(body["error"]["origin"], "https://evil.example");
    }

    #[tokio::test]
    async fn test_rerender_bare_status_keeps_headers() {
        let bare = (
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::ALLOW, "GET,HEAD")],
        )
            .into_response();
        let response = ApiError::from_status(StatusCode::METHOD_NOT_ALLOWED)
            .report()
            .rerender(bare, Environment::Production);

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "GET,HEAD");
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert!(response.extensions().get::<ErrorReport>().is_some());
        assert_eq!(
            body_json(response).await,
            json!({"status": "fail", "message": "Method Not Allowed", "error": {}})
        );
    }

    #[test]
    fn test_from_status() {
        assert!(matches!(
            ApiError::from_status(StatusCode::REQUEST_TIMEOUT),
            ApiError::Timeout
        ));
        let err = ApiError::from_status(StatusCode::BAD_GATEWAY);
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.status_label(), "error");
        assert_eq!(err.to_string(), "Bad Gateway");
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(ApiError::RateLimited.status_label(), "fail");
        assert_eq!(ApiError::NotFound("x".into()).status_label(), "fail");
        assert_eq!(
            ApiError::CorsRejected { origin: String::new() }.status_label(),
            "error"
        );
        assert_eq!(ApiError::Internal("x".into()).status_label(), "error");
    }

    #[test]
    fn test_report_collects_causes() {
        let report = ApiError::Mail(MailError::Rejected {
            status: 422,
            body: "bad recipient".into(),
        })
        .report();

        assert_eq!(report.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(report.message, "Failed to send test email");
        assert_eq!(
            report.detail["causes"][0],
            "mail API rejected message (422): bad recipient"
        );
    }
}
