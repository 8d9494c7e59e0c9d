//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Logging → Connect store → Bind → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal or fatal error → Stop accepting → Drain connections → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → ShutdownReason::Signal (exit 0)
//!
//! Fatal (fatal.rs):
//!     Panic → log → exit 1
//!     Background task error → ShutdownReason::Fatal → drain → exit 1
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The store is connected before the listener binds
//! - Fatal errors still drain in-flight requests

pub mod fatal;
pub mod shutdown;
pub mod signals;

pub use fatal::{install_panic_hook, spawn_guarded};
pub use shutdown::{Shutdown, ShutdownReason};
