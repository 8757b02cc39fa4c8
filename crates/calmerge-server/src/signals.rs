//! Unix signal handling for the server.
//!
//! - SIGTERM/SIGINT: graceful shutdown
//! - SIGHUP: immediate refresh of every source

use std::io;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

/// Signal types that the server handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Shutdown signal (SIGTERM, SIGINT).
    Shutdown,
    /// Refresh signal (SIGHUP).
    Refresh,
}

/// Signal handler that manages Unix signal processing.
pub struct SignalHandler {
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
    /// Counts refresh requests; each increment is one request.
    refresh_tx: Arc<watch::Sender<u64>>,
    refresh_rx: watch::Receiver<u64>,
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalHandler {
    /// Creates a new signal handler.
    pub fn new() -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (refresh_tx, refresh_rx) = watch::channel(0);

        Self {
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
            refresh_tx: Arc::new(refresh_tx),
            refresh_rx,
        }
    }

    /// Installs the signal handlers and spawns the listener task.
    ///
    /// Must be called from within a Tokio runtime.
    #[cfg(unix)]
    pub fn spawn_listener(&self) -> io::Result<()> {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sighup = signal(SignalKind::hangup())?;

        let shutdown_tx = self.shutdown_tx.clone();
        let refresh_tx = self.refresh_tx.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, initiating shutdown");
                        let _ = shutdown_tx.send(true);
                        break;
                    }
                    _ = sigint.recv() => {
                        info!("Received SIGINT, initiating shutdown");
                        let _ = shutdown_tx.send(true);
                        break;
                    }
                    _ = sighup.recv() => {
                        info!("Received SIGHUP, triggering refresh");
                        refresh_tx.send_modify(|n| *n += 1);
                    }
                }
            }

            debug!("Signal listener stopped");
        });

        Ok(())
    }

    /// Non-Unix implementation: only Ctrl+C, as a shutdown.
    #[cfg(not(unix))]
    pub fn spawn_listener(&self) -> io::Result<()> {
        let shutdown_tx = self.shutdown_tx.clone();

        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                info!("Received Ctrl+C, initiating shutdown");
                let _ = shutdown_tx.send(true);
            }
        });

        Ok(())
    }

    /// Returns a future that completes when a shutdown signal is received.
    pub fn shutdown(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.shutdown_rx.clone(),
        }
    }

    /// Returns a stream of refresh requests.
    ///
    /// Requests made before this call are not replayed.
    pub fn refresh_requests(&self) -> RefreshRequests {
        let mut rx = self.refresh_rx.clone();
        rx.mark_unchanged();
        RefreshRequests { rx }
    }
}

/// A signal that completes when shutdown is signaled.
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Waits for the shutdown signal.
    pub async fn wait(mut self) {
        // An error means every sender is gone; nothing can signal any more.
        let _ = self.rx.wait_for(|shutdown| *shutdown).await;
    }
}

/// Refresh requests coming from SIGHUP.
pub struct RefreshRequests {
    rx: watch::Receiver<u64>,
}

impl RefreshRequests {
    /// Waits for the next refresh request.
    ///
    /// Returns `None` once the handler is gone. Requests arriving while the
    /// previous one is still being served are coalesced into one.
    pub async fn next(&mut self) -> Option<Signal> {
        self.rx.changed().await.ok()?;
        self.rx.mark_unchanged();
        Some(Signal::Refresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn shutdown_signal_wait() {
        let handler = SignalHandler::new();
        let shutdown = handler.shutdown();

        let tx = handler.shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let _ = tx.send(true);
        });

        let result = tokio::time::timeout(Duration::from_millis(200), shutdown.wait()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn shutdown_already_signaled_completes_immediately() {
        let handler = SignalHandler::new();
        let _ = handler.shutdown_tx.send(true);

        let wait = handler.shutdown().wait();
        let result = tokio::time::timeout(Duration::from_millis(50), wait).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn shutdown_is_not_signaled_by_default() {
        let handler = SignalHandler::new();
        let wait = handler.shutdown().wait();
        let result = tokio::time::timeout(Duration::from_millis(20), wait).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn refresh_requests_are_delivered() {
        let handler = SignalHandler::new();
        let mut requests = handler.refresh_requests();

        handler.refresh_tx.send_modify(|n| *n += 1);
        let got = tokio::time::timeout(Duration::from_millis(50), requests.next()).await;
        assert_eq!(got.unwrap(), Some(Signal::Refresh));

        // Nothing pending after the request was consumed.
        let none = tokio::time::timeout(Duration::from_millis(20), requests.next()).await;
        assert!(none.is_err());
    }

    #[tokio::test]
    async fn earlier_refresh_requests_are_not_replayed() {
        let handler = SignalHandler::new();
        handler.refresh_tx.send_modify(|n| *n += 1);

        let mut requests = handler.refresh_requests();
        let none = tokio::time::timeout(Duration::from_millis(20), requests.next()).await;
        assert!(none.is_err());
    }
}
