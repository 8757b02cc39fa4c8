//! Background scheduler for periodic refreshes.
//!
//! The scheduler calls a refresh function every `refresh_interval` and on
//! demand through a [`SchedulerHandle`].

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between scheduled refreshes.
    pub refresh_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(15 * 60),
        }
    }
}

impl SchedulerConfig {
    /// Creates a scheduler config with the given interval.
    pub fn new(refresh_interval: Duration) -> Self {
        Self { refresh_interval }
    }
}

/// Commands that can be sent to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerCommand {
    /// Trigger an immediate refresh.
    RefreshNow,
    /// Stop the scheduler.
    Stop,
}

/// The scheduler runs refreshes at a fixed interval.
pub struct Scheduler {
    config: SchedulerConfig,
    command_tx: mpsc::Sender<SchedulerCommand>,
    command_rx: mpsc::Receiver<SchedulerCommand>,
}

impl Scheduler {
    /// Creates a new scheduler with the given configuration.
    pub fn new(config: SchedulerConfig) -> Self {
        let (command_tx, command_rx) = mpsc::channel(16);
        Self {
            config,
            command_tx,
            command_rx,
        }
    }

    /// Returns a handle for sending commands to the scheduler.
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            command_tx: self.command_tx.clone(),
        }
    }

    /// Runs the scheduler loop until stopped.
    ///
    /// The interval restarts after every refresh, scheduled or not. A command
    /// received while a refresh runs is handled once it completes.
    pub async fn run<F, Fut>(self, refresh_fn: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let Self {
            config,
            command_tx,
            mut command_rx,
        } = self;
        // Keep the channel open while running, even if every handle is dropped.
        let _command_tx = command_tx;

        info!(
            interval_secs = config.refresh_interval.as_secs(),
            "Scheduler started"
        );

        loop {
            debug!(
                delay_secs = config.refresh_interval.as_secs(),
                "Scheduling next refresh"
            );

            tokio::select! {
                _ = tokio::time::sleep(config.refresh_interval) => {
                    run_refresh(&refresh_fn).await;
                }
                cmd = command_rx.recv() => {
                    match cmd {
                        Some(SchedulerCommand::RefreshNow) => {
                            debug!("Received RefreshNow command");
                            run_refresh(&refresh_fn).await;
                        }
                        Some(SchedulerCommand::Stop) | None => {
                            info!("Scheduler stopping");
                            break;
                        }
                    }
                }
            }
        }
    }
}

async fn run_refresh<F, Fut>(refresh_fn: &F)
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    debug!("Starting scheduled refresh");
    refresh_fn().await;
    debug!("Scheduled refresh finished");
}

/// Handle for sending commands to a running scheduler.
#[derive(Clone, Debug)]
pub struct SchedulerHandle {
    command_tx: mpsc::Sender<SchedulerCommand>,
}

impl SchedulerHandle {
    /// Triggers an immediate refresh.
    pub async fn refresh_now(&self) -> Result<(), mpsc::error::SendError<SchedulerCommand>> {
        self.command_tx.send(SchedulerCommand::RefreshNow).await
    }

    /// Stops the scheduler.
    pub async fn stop(&self) -> Result<(), mpsc::error::SendError<SchedulerCommand>> {
        self.command_tx.send(SchedulerCommand::Stop).await
    }

    /// Stops the scheduler, logging instead of failing if it already exited.
    pub async fn shutdown(&self) {
        if let Err(e) = self.stop().await {
            warn!(error = %e, "Failed to send stop command to scheduler");
        }
    }
}
