use crate::todoist::{BackoffPolicy, SourceError, TaskSource, get_task_with_backoff};

/// Fraction of sub-tasks done, `completed / (completed + pending)`.
///
/// A task without any sub-tasks has progress `0.0`.
pub fn progress_ratio(completed: usize, pending: usize) -> f64 {
    let total = completed + pending;
    if total == 0 {
        return 0.0;
    }
    completed as f64 / total as f64
}

/// Computes the completion ratio of a task from its sub-tasks.
pub struct ProgressCalculator<'a, S: TaskSource + ?Sized> {
    source: &'a S,
    backoff: BackoffPolicy,
}

impl<'a, S: TaskSource + ?Sized> ProgressCalculator<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            backoff: BackoffPolicy::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Computes the progress of `task_id` in `[0.0, 1.0]`.
    ///
    /// Completed sub-tasks that cannot be resolved even after retrying are left
    /// out of the count. A failing listing call is returned to the caller.
    #[tracing::instrument(skip(self))]
    pub async fn compute_progress(&self, task_id: &str) -> Result<f64, SourceError> {
        tracing::info!("Computing task progress for Task ID: {}", task_id);
        let completed = self.count_completed_subtasks(task_id).await?;
        let pending = self.count_pending_subtasks(task_id).await?;
        let progress = progress_ratio(completed, pending);
        tracing::info!(
            "Computed progress {:.4} for Task ID: {} ({} completed, {} pending)",
            progress,
            task_id,
            completed,
            pending
        );
        Ok(progress)
    }

    async fn count_completed_subtasks(&self, task_id: &str) -> Result<usize, SourceError> {
        let completed_records = self.source.list_completed_tasks().await?;
        let mut count = 0;
        for record in completed_records {
            match get_task_with_backoff(self.source, &record.task_id, self.backoff).await {
                Some(task) if task.is_child_of(task_id) => count += 1,
                Some(_) => {}
                None => tracing::warn!(
                    "Excluding completed task {} from progress of {}: lookup exhausted retries",
                    record.task_id,
                    task_id
                ),
            }
        }
        Ok(count)
    }

    async fn count_pending_subtasks(&self, task_id: &str) -> Result<usize, SourceError> {
        let tasks = self.source.list_tasks().await?;
        Ok(tasks.iter().filter(|task| task.is_child_of(task_id)).count())
    }
}
