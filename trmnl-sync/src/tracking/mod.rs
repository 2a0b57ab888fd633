use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::progress::ProgressCalculator;
use crate::todoist::{BackoffPolicy, SourceError, TaskRecord, TaskSource};
use crate::trmnl::format_progress;

pub mod api;
pub mod web;

/// Snapshot of a tracked task, built fresh for every fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Task {
    /// Task title
    pub title: String,
    /// Todoist task ID
    pub id: String,
    /// Human readable due date, if the task has one
    pub due: Option<String>,
    /// Fraction of sub-tasks completed, between 0 and 1
    pub progress: f64,
}

impl Task {
    /// Progress formatted as a percentage with two decimals, e.g. "66.67%".
    pub fn progress_percentage(&self) -> String {
        format_progress(self.progress)
    }
}

/// Error type for tracked task assembly.
#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error("Failed to fetch tracked tasks: {0}")]
    FetchFailed(#[from] SourceError),
}

/// Builds [`Task`] snapshots for every task carrying the tracked label.
pub struct TaskTracker<S> {
    source: S,
    label: String,
    backoff: BackoffPolicy,
}

impl<S: TaskSource> TaskTracker<S> {
    pub fn new(source: S, label: impl Into<String>) -> Self {
        Self {
            source,
            label: label.into(),
            backoff: BackoffPolicy::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Fetches all tasks carrying the tracked label together with their progress.
    #[tracing::instrument(skip(self), fields(label = %self.label))]
    pub async fn get_tracked_tasks(&self) -> Result<Vec<Task>, TrackingError> {
        tracing::info!("Getting tracked tasks...");
        let calculator = ProgressCalculator::new(&self.source).with_backoff(self.backoff);
        let tasks = self.source.list_tasks().await?;

        let mut tracked = Vec::new();
        for record in tasks.into_iter().filter(|task| task.has_label(&self.label)) {
            tracing::info!(
                "Working on Task ID: {} Task Title: {}",
                record.id,
                record.content
            );
            let progress = calculator.compute_progress(&record.id).await?;
            tracked.push(Self::build_task(record, progress));
        }

        tracing::info!("Received {} tracked tasks", tracked.len());
        Ok(tracked)
    }

    fn build_task(record: TaskRecord, progress: f64) -> Task {
        Task {
            title: record.content,
            id: record.id,
            due: record.due.map(|due| due.string),
            progress,
        }
    }
}
