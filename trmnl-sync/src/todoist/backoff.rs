use retry_policies::policies::ExponentialBackoff;
use retry_policies::{Jitter, RetryDecision, RetryPolicy};
use std::time::{Duration, SystemTime};

use super::{TaskRecord, TaskSource};

/// Retry schedule for single task lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub factor: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(100),
            factor: 2,
        }
    }
}

impl BackoffPolicy {
    /// Exponential schedule without jitter, bounded by the delay before the last attempt.
    fn exponential(self) -> ExponentialBackoff {
        let retries = self.max_attempts.saturating_sub(1);
        let max_delay = self
            .initial_delay
            .saturating_mul(self.factor.saturating_pow(retries.saturating_sub(1)));
        ExponentialBackoff::builder()
            .retry_bounds(self.initial_delay, max_delay)
            .jitter(Jitter::None)
            .base(self.factor)
            .build_with_max_retries(retries)
    }

    /// Delays slept between consecutive attempts, one fewer than `max_attempts`.
    pub fn delays(self) -> impl Iterator<Item = Duration> {
        let schedule = self.exponential();
        let started = SystemTime::now();
        (0..).map_while(move |past_retries| next_delay(&schedule, started, past_retries))
    }
}

/// Delay before the next attempt, or `None` once the retries are used up.
///
/// The policy answers with a wall clock instant, so it is turned back into a
/// delay at millisecond resolution.
fn next_delay(
    schedule: &ExponentialBackoff,
    started: SystemTime,
    past_retries: u32,
) -> Option<Duration> {
    let now = SystemTime::now();
    match schedule.should_retry(started, past_retries) {
        RetryDecision::Retry { execute_after } => {
            let delay = execute_after.duration_since(now).unwrap_or_default();
            Some(Duration::from_millis(delay.as_millis() as u64))
        }
        RetryDecision::DoNotRetry => None,
    }
}

/// Fetches a task, retrying with exponential backoff.
///
/// Returns `None` once every attempt has failed. Callers treat a missing task
/// as "leave it out of the count". The retry sequence always runs to
/// completion; it is not cancellable.
#[tracing::instrument(skip(source, policy))]
pub async fn get_task_with_backoff<S: TaskSource + ?Sized>(
    source: &S,
    task_id: &str,
    policy: BackoffPolicy,
) -> Option<TaskRecord> {
    let schedule = policy.exponential();
    let started = SystemTime::now();
    let mut attempt = 0;

    while attempt < policy.max_attempts {
        attempt += 1;
        match source.get_task(task_id).await {
            Ok(task) => return Some(task),
            Err(err) => match next_delay(&schedule, started, attempt - 1) {
                Some(delay) => {
                    tracing::info!(
                        "Attempt {}/{} to fetch task {} failed: {}. Retrying in {:?}",
                        attempt,
                        policy.max_attempts,
                        task_id,
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    tracing::warn!(
                        "Attempt {}/{} to fetch task {} failed: {}",
                        attempt,
                        policy.max_attempts,
                        task_id,
                        err
                    );
                }
            },
        }
    }

    tracing::error!(
        "Giving up on task {} after {} attempts",
        task_id,
        policy.max_attempts
    );
    None
}
