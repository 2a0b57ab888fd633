//! Background job pushing tracked tasks and countdowns to the display webhooks.
//!
//! One cycle runs right after start-up, then one per interval until stopped.
//! Cycles never overlap and a failing step never stops the other step or the
//! loop itself.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::countdown::CountdownStore;
use crate::todoist::TaskSource;
use crate::tracking::{TaskTracker, TrackingError};
use crate::trmnl::{CountdownPayload, DeliveryError, TaskProgressPayload, WebhookClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    RunningCycle,
    Sleeping,
    Stopped,
}

/// Error type for a single step of a sync cycle.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Fetch(#[from] TrackingError),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

/// Outcome of one cycle. Each step reports the number of items posted.
#[derive(Debug)]
pub struct CycleReport {
    pub tasks: Result<usize, SyncError>,
    pub countdowns: Result<usize, SyncError>,
}

impl CycleReport {
    pub fn is_success(&self) -> bool {
        self.tasks.is_ok() && self.countdowns.is_ok()
    }
}

/// Webhook URLs for the two datasets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub tasks: String,
    pub countdowns: String,
}

impl Endpoints {
    pub fn from_config(config: &Config) -> Self {
        Self {
            tasks: config.todoist_endpoint.clone(),
            countdowns: config.countdown_endpoint.clone(),
        }
    }
}

pub struct SyncScheduler<S> {
    tracker: TaskTracker<S>,
    countdowns: Arc<CountdownStore>,
    webhook: WebhookClient,
    endpoints: Endpoints,
    interval: Duration,
    state: watch::Sender<SchedulerState>,
}

impl<S: TaskSource + 'static> SyncScheduler<S> {
    pub fn new(
        tracker: TaskTracker<S>,
        countdowns: Arc<CountdownStore>,
        webhook: WebhookClient,
        endpoints: Endpoints,
        interval: Duration,
    ) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self {
            tracker,
            countdowns,
            webhook,
            endpoints,
            interval,
            state,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: SchedulerState) {
        self.state.send_replace(state);
    }

    /// Runs one cycle: tracked tasks first, then countdowns.
    pub async fn run_cycle(&self) -> CycleReport {
        tracing::info!("Starting TRMNL sync cycle...");

        let tasks = self.post_tasks().await;
        match &tasks {
            Ok(count) => tracing::info!("Posted {} tracked tasks", count),
            Err(SyncError::Fetch(err)) => {
                tracing::error!("Skipping task progress update: {}", err)
            }
            Err(err) => tracing::error!("Failed to post task progress: {}", err),
        }

        let countdowns = self.post_countdowns().await;
        match &countdowns {
            Ok(count) => tracing::info!("Posted {} countdowns", count),
            Err(err) => tracing::error!("Failed to post countdown data: {}", err),
        }

        let report = CycleReport { tasks, countdowns };
        if report.is_success() {
            tracing::info!("TRMNL sync cycle completed successfully");
        } else {
            tracing::warn!("TRMNL sync cycle completed with errors");
        }
        report
    }

    #[tracing::instrument(skip(self))]
    async fn post_tasks(&self) -> Result<usize, SyncError> {
        tracing::info!("Fetching Todoist data...");
        let tasks = self.tracker.get_tracked_tasks().await?;
        let payload = TaskProgressPayload::new(&tasks, Utc::now());

        tracing::info!("Posting Todoist data to {}", self.endpoints.tasks);
        self.webhook.post(&self.endpoints.tasks, &payload).await?;
        Ok(tasks.len())
    }

    #[tracing::instrument(skip(self))]
    async fn post_countdowns(&self) -> Result<usize, SyncError> {
        tracing::info!("Fetching countdown data...");
        let countdowns = self.countdowns.list_all().await;
        let payload = CountdownPayload::new(&countdowns, Utc::now());

        tracing::info!("Posting countdown data to {}", self.endpoints.countdowns);
        self.webhook
            .post(&self.endpoints.countdowns, &payload)
            .await?;
        Ok(countdowns.len())
    }

    /// Runs cycles until `token` is cancelled.
    ///
    /// Cancellation interrupts the sleep between cycles but never a running cycle.
    pub async fn run(self, token: CancellationToken) {
        tracing::info!(
            "TRMNL sync started - will run every {} minutes",
            self.interval.as_secs() / 60
        );

        while !token.is_cancelled() {
            self.set_state(SchedulerState::RunningCycle);
            self.run_cycle().await;

            self.set_state(SchedulerState::Sleeping);
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        self.set_state(SchedulerState::Stopped);
        tracing::info!("TRMNL sync stopped");
    }

    /// Starts the loop on a background task.
    pub fn spawn(self) -> SchedulerHandle {
        let token = CancellationToken::new();
        let state = self.subscribe();
        let join = tokio::spawn(self.run(token.clone()));
        SchedulerHandle { token, state, join }
    }
}

/// Control handle for a spawned [`SyncScheduler`].
#[derive(Debug)]
pub struct SchedulerHandle {
    token: CancellationToken,
    state: watch::Receiver<SchedulerState>,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.clone()
    }

    /// Asks the loop to stop at the next sleep boundary.
    pub fn stop(&self) {
        self.token.cancel();
    }

    /// Stops the loop and waits for it to finish its current cycle.
    pub async fn shutdown(self) -> Result<(), tokio::task::JoinError> {
        self.stop();
        self.join.await
    }
}
