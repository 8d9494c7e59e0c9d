//! Shutdown coordination.

use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

/// Why the process is going down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGINT / SIGTERM. Exit code 0 after draining.
    Signal,
    /// Unhandled error in a background task or the server. Exit code 1.
    Fatal,
}

impl ShutdownReason {
    pub fn exit_code(self) -> i32 {
        match self {
            ShutdownReason::Signal => 0,
            ShutdownReason::Fatal => 1,
        }
    }
}

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that all long-running tasks can subscribe to.
/// The first trigger wins; its reason is kept for the exit code.
#[derive(Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<ShutdownReason>,
    reason: Arc<Mutex<Option<ShutdownReason>>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(4);
        Self {
            tx,
            reason: Arc::new(Mutex::new(None)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ShutdownReason> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal. Later triggers only escalate
    /// `Signal` to `Fatal`.
    pub fn trigger(&self, reason: ShutdownReason) {
        let mut current = self.reason.lock().unwrap_or_else(|e| e.into_inner());
        match *current {
            None => *current = Some(reason),
            Some(ShutdownReason::Signal) if reason == ShutdownReason::Fatal => {
                *current = Some(reason)
            }
            Some(_) => {}
        }
        let _ = self.tx.send(reason);
    }

    /// Reason recorded by the first trigger, if any.
    pub fn reason(&self) -> Option<ShutdownReason> {
        *self.reason.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Resolves once shutdown has been triggered.
    pub async fn wait(&self) -> ShutdownReason {
        let mut rx = self.subscribe();
        if let Some(reason) = self.reason() {
            return reason;
        }
        match rx.recv().await {
            Ok(reason) => reason,
            Err(_) => self.reason().unwrap_or(ShutdownReason::Fatal),
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_wait_returns_reason() {
        let shutdown = Shutdown::new();
        let waiter = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { shutdown.wait().await })
        };
        tokio::task::yield_now().await;
        shutdown.trigger(ShutdownReason::Signal);
        assert_eq!(waiter.await.unwrap(), ShutdownReason::Signal);
    }

    #[tokio::test]
    async fn test_wait_after_trigger() {
        let shutdown = Shutdown::new();
        shutdown.trigger(ShutdownReason::Fatal);
        assert_eq!(shutdown.wait().await, ShutdownReason::Fatal);
    }

    #[test]
    fn test_fatal_escalates_signal() {
        let shutdown = Shutdown::new();
        shutdown.trigger(ShutdownReason::Signal);
        shutdown.trigger(ShutdownReason::Fatal);
        assert_eq!(shutdown.reason(), Some(ShutdownReason::Fatal));
        assert_eq!(shutdown.reason().map(ShutdownReason::exit_code), Some(1));

        let shutdown = Shutdown::new();
        shutdown.trigger(ShutdownReason::Fatal);
        shutdown.trigger(ShutdownReason::Signal);
        assert_eq!(shutdown.reason(), Some(ShutdownReason::Fatal));
    }
}
