//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Pipeline, stages, handlers:
//!     → logging.rs (tracing events, JSON in production)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (log aggregation)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every log line via TraceLayer spans
//! - Metrics are cheap when no exporter is installed

pub mod logging;
pub mod metrics;
