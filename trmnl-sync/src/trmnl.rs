//! Payloads and delivery for the TRMNL custom plugin webhooks.

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::StatusCode;
use serde::Serialize;
use std::time::Duration;

use crate::countdown::Countdown;
use crate::tracking::Task;

pub const DEFAULT_TODOIST_ENDPOINT: &str =
    "https://usetrmnl.com/api/custom_plugins/todoist_endpoint";
pub const DEFAULT_COUNTDOWN_ENDPOINT: &str =
    "https://usetrmnl.com/api/custom_plugins/countdown_endpoint";

/// Timeout for a single webhook POST.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Formats a progress ratio as a percentage with two decimals, e.g. `0.5` as "50.00%".
pub fn format_progress(progress: f64) -> String {
    format!("{:.2}%", progress * 100.0)
}

/// ISO-8601 UTC timestamp with a `Z` suffix.
pub fn utc_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskProgressItem {
    pub title: String,
    pub progress: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskProgressVariables {
    pub tasks: Vec<TaskProgressItem>,
    pub timestamp: String,
    pub total_tasks: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskProgressPayload {
    pub merge_variables: TaskProgressVariables,
}

impl TaskProgressPayload {
    pub fn new(tasks: &[Task], time: DateTime<Utc>) -> Self {
        let tasks: Vec<TaskProgressItem> = tasks
            .iter()
            .map(|task| TaskProgressItem {
                title: task.title.clone(),
                progress: task.progress_percentage(),
            })
            .collect();
        Self {
            merge_variables: TaskProgressVariables {
                total_tasks: tasks.len(),
                tasks,
                timestamp: utc_timestamp(time),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountdownItem {
    pub title: String,
    pub days_remaining: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountdownVariables {
    pub countdowns: Vec<CountdownItem>,
    pub timestamp: String,
    pub total_countdowns: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountdownPayload {
    pub merge_variables: CountdownVariables,
}

impl CountdownPayload {
    pub fn new(countdowns: &[Countdown], time: DateTime<Utc>) -> Self {
        let countdowns: Vec<CountdownItem> = countdowns
            .iter()
            .map(|countdown| CountdownItem {
                title: countdown.title.clone(),
                days_remaining: countdown.days_remaining,
            })
            .collect();
        Self {
            merge_variables: CountdownVariables {
                total_countdowns: countdowns.len(),
                countdowns,
                timestamp: utc_timestamp(time),
            },
        }
    }
}

/// Error type for webhook delivery.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Webhook request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Webhook responded with status {status}: {body}")]
    Status { status: StatusCode, body: String },
}

/// Posts JSON payloads to webhook endpoints.
#[derive(Debug, Clone)]
pub struct WebhookClient {
    http: reqwest::Client,
}

impl WebhookClient {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    /// Posts `payload` to `url`. Only a 200 response counts as delivered.
    #[tracing::instrument(skip(self, payload))]
    pub async fn post<P: Serialize + ?Sized>(
        &self,
        url: &str,
        payload: &P,
    ) -> Result<(), DeliveryError> {
        let response = self.http.post(url).json(payload).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Status { status, body });
        }
        Ok(())
    }
}
