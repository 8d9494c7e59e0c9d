//! Process-level failure handling.
//!
//! Panics and background task failures are never swallowed. A panic is
//! logged and the process exits immediately; a failed task triggers a fatal
//! shutdown so in-flight requests can drain first.

use std::future::Future;

use tokio::task::JoinHandle;

use crate::lifecycle::shutdown::{Shutdown, ShutdownReason};

/// Log panics through tracing, then exit with status 1.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_default();
        let message = info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());

        tracing::error!(%location, %message, "UNCAUGHT EXCEPTION! Shutting down...");
        std::process::exit(1);
    }));
}

/// Spawn a background task whose error escalates to a fatal shutdown.
pub fn spawn_guarded<F, E>(name: &'static str, shutdown: Shutdown, task: F) -> JoinHandle<()>
where
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = task.await {
            tracing::error!(task = name, error = %e, "UNHANDLED REJECTION! Shutting down...");
            shutdown.trigger(ShutdownReason::Fatal);
        }
    })
}
