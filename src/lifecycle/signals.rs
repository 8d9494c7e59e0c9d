//! OS signal handling.
//!
//! SIGINT and SIGTERM both map to a graceful [`ShutdownReason::Signal`].
//! Failing to install a handler is an error for the caller to escalate.

use crate::lifecycle::shutdown::{Shutdown, ShutdownReason};

/// Wait for SIGINT or SIGTERM, then trigger shutdown.
pub async fn listen(shutdown: Shutdown) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                tracing::info!(signal = "SIGINT", "Shutdown signal received");
            }
            _ = terminate.recv() => {
                tracing::info!(signal = "SIGTERM", "Shutdown signal received");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        tracing::info!(signal = "SIGINT", "Shutdown signal received");
    }

    shutdown.trigger(ShutdownReason::Signal);
    Ok(())
}
