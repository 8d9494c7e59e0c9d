//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, tower layers, request ID)
//!     → pipeline.rs (ordered stages, see security/)
//!     → cookies.rs (cookie map for later stages and handlers)
//!     → routes/ (handlers)
//!     → error.rs (every failure becomes an ErrorReport)
//!     → pipeline.rs (one error rendering per response, stage headers)
//!     → Send to client
//! ```

pub mod cookies;
pub mod error;
pub mod pipeline;
pub mod request;
pub mod response;
pub mod server;

pub use error::{ApiError, ErrorReport};
pub use pipeline::{Outcome, Pipeline, Stage, StageContext};
pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
