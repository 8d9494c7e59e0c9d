//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → headers.rs (schedule hardening response headers)
//!     → cors.rs (origin allow-list, preflight)
//!     → rate_limit.rs (per-IP fixed window)
//!     → limits.rs (body size ceiling, JSON parse)
//!     → [cookie parsing]
//!     → sanitize.rs (operator keys, markup)
//!     → Pass to routing
//! ```
//!
//! # Design Decisions
//! - Defense in depth: multiple layers of protection
//! - Fail closed: reject on any security check failure
//! - No trust in client input, including forwarding headers

pub mod cors;
pub mod headers;
pub mod limits;
pub mod rate_limit;
pub mod sanitize;

pub use cors::CorsGate;
pub use headers::SecurityHeaders;
pub use limits::{BodyParser, ParsedBody};
pub use rate_limit::{FixedWindowLimiter, RateLimit};
pub use sanitize::Sanitizer;
