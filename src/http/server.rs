//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the request pipeline in its fixed stage order
//! - Create the Axum router with all API routes
//! - Wire up tower layers (tracing, request ID, timeout)
//! - Bind server to listener and drain on shutdown
//! - Sweep expired rate-limit windows in the background

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, http::Request, middleware, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::http::cookies::CookieParser;
use crate::http::pipeline::{run_pipeline, Pipeline};
use crate::http::request::{MakeRequestUuid, X_REQUEST_ID};
use crate::lifecycle::{spawn_guarded, Shutdown};
use crate::mail::Mailer;
use crate::routes;
use crate::security::{
    BodyParser, CorsGate, FixedWindowLimiter, RateLimit, Sanitizer, SecurityHeaders,
};
use crate::store::DocumentStore;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DocumentStore>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn DocumentStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            mailer,
        }
    }
}

/// The API server.
pub struct HttpServer {
    router: Router,
    limiter: Arc<FixedWindowLimiter>,
    sweep_interval: Duration,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        let limiter = Arc::new(FixedWindowLimiter::from_config(&state.config.rate_limit));
        let pipeline = Arc::new(build_pipeline(&state.config, limiter.clone()));

        tracing::debug!(stages = ?pipeline.stage_names(), "Request pipeline assembled");

        let sweep_interval =
            Duration::from_secs(state.config.rate_limit.sweep_interval_secs.max(1));
        let router = Self::build_router(state, pipeline);

        Self {
            router,
            limiter,
            sweep_interval,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState, pipeline: Arc<Pipeline>) -> Router {
        let timeout = Duration::from_secs(state.config.listener.request_timeout_secs);

        routes::api_router(state.clone())
            .fallback(routes::not_found)
            .method_not_allowed_fallback(routes::method_not_allowed)
            .with_state(state)
            .layer(TimeoutLayer::new(timeout))
            .layer(middleware::from_fn_with_state(pipeline, run_pipeline))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(X_REQUEST_ID)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id,
                )
            }))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let sweeper = spawn_guarded(
            "rate_limit_sweeper",
            shutdown.clone(),
            sweep_windows(self.limiter.clone(), self.sweep_interval, shutdown.clone()),
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let signal = shutdown.clone();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let reason = signal.wait().await;
                tracing::info!(?reason, "Draining connections");
            })
            .await?;

        sweeper.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The fully layered router, for driving requests without a socket.
    pub fn into_router(self) -> Router {
        self.router
    }
}

/// Stage order: security headers, CORS, rate limit, body parsing, cookies,
/// sanitization. Routing happens after the last stage.
pub fn build_pipeline(config: &AppConfig, limiter: Arc<FixedWindowLimiter>) -> Pipeline {
    let mut pipeline = Pipeline::new(config.environment);

    if config.security.enable_headers {
        pipeline = pipeline.with_stage(SecurityHeaders::new());
    }
    pipeline = pipeline.with_stage(CorsGate::new(&config.cors));
    if config.rate_limit.enabled {
        pipeline = pipeline.with_stage(RateLimit::new(limiter, &config.rate_limit));
    }

    pipeline
        .with_stage(BodyParser::new(config.security.max_body_size))
        .with_stage(CookieParser)
        .with_stage(Sanitizer)
}

/// Runs until shutdown. Losing the shutdown channel while the server is
/// still up is an error.
async fn sweep_windows(
    limiter: Arc<FixedWindowLimiter>,
    every: Duration,
    shutdown: Shutdown,
) -> Result<(), RecvError> {
    let mut rx = shutdown.subscribe();
    drop(shutdown);
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let purged = limiter.purge_expired();
                if purged > 0 {
                    tracing::debug!(purged, tracked = limiter.tracked_clients(), "Swept rate limit windows");
                }
            }
            received = rx.recv() => match received {
                Ok(_) | Err(RecvError::Lagged(_)) => return Ok(()),
                Err(e @ RecvError::Closed) => return Err(e),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;

    #[test]
    fn test_stage_order() {
        let config = AppConfig::default();
        let limiter = Arc::new(FixedWindowLimiter::from_config(&config.rate_limit));
        let pipeline = build_pipeline(&config, limiter);
        assert_eq!(
            pipeline.stage_names(),
            vec!["security_headers", "cors", "rate_limit", "body", "cookies", "sanitize"]
        );
    }

    struct NoopMailer;

    #[async_trait::async_trait]
    impl Mailer for NoopMailer {
        async fn send(&self, _message: &crate::mail::EmailMessage) -> Result<(), crate::mail::MailError> {
            Ok(())
        }
    }

    fn router() -> Router {
        let state = AppState::new(
            AppConfig::default(),
            Arc::new(crate::store::MemoryStore::new()),
            Arc::new(NoopMailer),
        );
        HttpServer::new(state).into_router()
    }

    #[tokio::test]
    async fn test_router_without_connect_info() {
        use axum::http::StatusCode;
        use tower::ServiceExt;

        let response = router()
            .oneshot(Request::get("/api/v1/videos").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("ratelimit-limit"));
        assert!(response.headers().contains_key(X_REQUEST_ID));
        assert_eq!(response.headers()["x-frame-options"], "SAMEORIGIN");
    }

    #[tokio::test]
    async fn test_signal_shutdown_stops_sweeper_cleanly() {
        let state = AppState::new(
            AppConfig::default(),
            Arc::new(crate::store::MemoryStore::new()),
            Arc::new(NoopMailer),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let shutdown = Shutdown::new();
        let server = tokio::spawn(HttpServer::new(state).run(listener, shutdown.clone()));

        tokio::task::yield_now().await;
        shutdown.trigger(crate::lifecycle::ShutdownReason::Signal);

        server.await.unwrap().unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(
            shutdown.reason(),
            Some(crate::lifecycle::ShutdownReason::Signal)
        );
    }

    #[tokio::test]
    async fn test_sweeper_fails_when_shutdown_channel_is_lost() {
        let limiter = Arc::new(FixedWindowLimiter::new(Duration::from_secs(60), 10));
        let shutdown = Shutdown::new();
        let guard = Shutdown::new();

        let handle = spawn_guarded(
            "rate_limit_sweeper",
            guard.clone(),
            sweep_windows(limiter, Duration::from_secs(60), shutdown),
        );
        handle.await.unwrap();

        assert_eq!(guard.reason(), Some(crate::lifecycle::ShutdownReason::Fatal));
    }

    #[test]
    fn test_disabled_stages_are_skipped() {
        let mut config = AppConfig::default();
        config.environment = Environment::Test;
        config.rate_limit.enabled = false;
        config.security.enable_headers = false;
        let limiter = Arc::new(FixedWindowLimiter::from_config(&config.rate_limit));
        let pipeline = build_pipeline(&config, limiter);
        assert_eq!(pipeline.stage_names(), vec!["cors", "body", "cookies", "sanitize"]);
    }
}
